//! Deterministic ARN derivation.
//!
//! The function ARN follows the platform naming convention, so the trigger
//! stage can address the function without a lookup once the account and
//! region are known.

pub fn function_arn(region: &str, account_id: &str, function_name: &str) -> String {
    format!("arn:aws:lambda:{region}:{account_id}:function:{function_name}")
}

pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}

pub fn bucket_objects_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}/*")
}
