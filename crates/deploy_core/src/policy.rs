//! IAM policy documents attached to the execution role.

use serde_json::json;

use crate::arn;

/// Only the Lambda service may assume the execution role.
pub const TRUST_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const BASIC_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";
pub const ACCESS_POLICY_NAME: &str = "LambdaS3AccessPolicy";

pub fn trust_policy_document() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": TRUST_PRINCIPAL },
            "Action": "sts:AssumeRole",
        }]
    })
    .to_string()
}

/// Inline S3 access policy. With a bucket allowlist the grant covers exactly
/// those buckets and their objects; without one it falls back to a
/// permissive wildcard, which is least-privilege-by-configuration rather
/// than by default.
pub fn access_policy_document(buckets: Option<&[String]>) -> String {
    let statement = match buckets {
        Some(buckets) if !buckets.is_empty() => {
            let mut resources = Vec::with_capacity(buckets.len() * 2);
            for bucket in buckets {
                resources.push(arn::bucket_arn(bucket));
                resources.push(arn::bucket_objects_arn(bucket));
            }
            json!({
                "Effect": "Allow",
                "Action": ["s3:GetObject", "s3:PutObject"],
                "Resource": resources,
            })
        }
        _ => json!({
            "Effect": "Allow",
            "Action": ["s3:*"],
            "Resource": ["*"],
        }),
    };

    json!({
        "Version": "2012-10-17",
        "Statement": [statement],
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn parsed(document: &str) -> Value {
        serde_json::from_str(document).expect("policy document should be valid json")
    }

    #[test]
    fn trust_policy_names_only_the_lambda_service() {
        let document = parsed(&trust_policy_document());
        assert_eq!(
            document["Statement"][0]["Principal"]["Service"],
            TRUST_PRINCIPAL
        );
        assert_eq!(document["Statement"][0]["Action"], "sts:AssumeRole");
    }

    #[test]
    fn scoped_access_policy_lists_each_bucket_and_its_objects() {
        let buckets = vec!["audio-drop".to_string(), "audio-out".to_string()];
        let document = parsed(&access_policy_document(Some(&buckets)));
        let resources = document["Statement"][0]["Resource"]
            .as_array()
            .expect("resources should be a list");
        assert_eq!(
            resources,
            &[
                "arn:aws:s3:::audio-drop",
                "arn:aws:s3:::audio-drop/*",
                "arn:aws:s3:::audio-out",
                "arn:aws:s3:::audio-out/*",
            ]
        );
        assert_eq!(
            document["Statement"][0]["Action"],
            serde_json::json!(["s3:GetObject", "s3:PutObject"])
        );
    }

    #[test]
    fn missing_allowlist_falls_back_to_wildcard_access() {
        let empty: Vec<String> = Vec::new();
        for document in [
            access_policy_document(None),
            access_policy_document(Some(&empty)),
        ] {
            let document = parsed(&document);
            assert_eq!(document["Statement"][0]["Action"], serde_json::json!(["s3:*"]));
            assert_eq!(document["Statement"][0]["Resource"], serde_json::json!(["*"]));
        }
    }
}
