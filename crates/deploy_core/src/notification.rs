//! Bucket notification bindings and their reconciliation.
//!
//! The remote notification API takes the complete binding set per write, so
//! convergence is a read-filter-append-replace: bindings owned by other
//! functions pass through untouched, this function's bindings are rebuilt
//! from the requested suffixes.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketBinding {
    pub id: Option<String>,
    pub function_arn: String,
    pub events: Vec<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

pub const OBJECT_CREATED_EVENT: &str = "s3:ObjectCreated:*";

/// Binding name derived from the suffix, minus any leading dot. Doubles as
/// the per-bucket uniqueness key across one function's suffixes.
pub fn binding_id(suffix: &str) -> String {
    suffix.trim_start_matches('.').to_string()
}

pub fn suffix_binding(function_arn: &str, suffix: &str) -> BucketBinding {
    let trimmed = binding_id(suffix);
    BucketBinding {
        id: Some(trimmed.clone()),
        function_arn: function_arn.to_string(),
        events: vec![OBJECT_CREATED_EVENT.to_string()],
        prefix: None,
        suffix: Some(trimmed),
    }
}

pub fn has_binding_for(existing: &[BucketBinding], function_arn: &str) -> bool {
    existing
        .iter()
        .any(|binding| binding.function_arn == function_arn)
}

pub fn reconcile_bindings(
    existing: &[BucketBinding],
    function_arn: &str,
    suffixes: &[String],
) -> Vec<BucketBinding> {
    let mut desired: Vec<BucketBinding> = existing
        .iter()
        .filter(|binding| binding.function_arn != function_arn)
        .cloned()
        .collect();
    for suffix in suffixes {
        desired.push(suffix_binding(function_arn, suffix));
    }
    desired
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWN_ARN: &str = "arn:aws:lambda:eu-west-1:123456789012:function:b";
    const FOREIGN_ARN: &str = "arn:aws:lambda:eu-west-1:123456789012:function:a";

    fn foreign_binding() -> BucketBinding {
        BucketBinding {
            id: Some("existing".to_string()),
            function_arn: FOREIGN_ARN.to_string(),
            events: vec![OBJECT_CREATED_EVENT.to_string()],
            prefix: Some("incoming/".to_string()),
            suffix: Some("csv".to_string()),
        }
    }

    #[test]
    fn binding_id_strips_the_leading_dot() {
        assert_eq!(binding_id(".wav"), "wav");
        assert_eq!(binding_id("mp3"), "mp3");
    }

    #[test]
    fn foreign_bindings_pass_through_untouched() {
        let existing = vec![foreign_binding()];
        let suffixes = vec![".wav".to_string(), ".mp3".to_string()];

        let desired = reconcile_bindings(&existing, OWN_ARN, &suffixes);

        assert_eq!(desired.len(), 3);
        assert_eq!(desired[0], foreign_binding());
        assert_eq!(desired[1].id.as_deref(), Some("wav"));
        assert_eq!(desired[2].id.as_deref(), Some("mp3"));
        assert!(desired[1..]
            .iter()
            .all(|binding| binding.function_arn == OWN_ARN));
    }

    #[test]
    fn own_stale_bindings_are_dropped_before_appending() {
        let existing = vec![
            foreign_binding(),
            suffix_binding(OWN_ARN, ".flac"),
            suffix_binding(OWN_ARN, ".ogg"),
        ];
        let suffixes = vec![".wav".to_string()];

        let desired = reconcile_bindings(&existing, OWN_ARN, &suffixes);

        assert_eq!(desired.len(), 2);
        assert_eq!(desired[0].function_arn, FOREIGN_ARN);
        assert_eq!(desired[1].suffix.as_deref(), Some("wav"));
    }

    #[test]
    fn existing_binding_detection_matches_on_arn() {
        let existing = vec![foreign_binding()];
        assert!(has_binding_for(&existing, FOREIGN_ARN));
        assert!(!has_binding_for(&existing, OWN_ARN));
    }
}
