//! Execution role provisioning.

use deploy_core::config::DeploymentSpec;
use deploy_core::policy;

use crate::adapters::roles::{RoleRecord, RoleStore};
use crate::error::DeployError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutcome {
    /// Role already existed and was left as-is.
    Unchanged(String),
    Created(String),
    /// Role existed, was deleted, and was created again. Any function still
    /// bound to the old ARN needs its configuration updated afterwards,
    /// which the pipeline does by running the deploy stage next.
    Recreated(String),
}

impl RoleOutcome {
    pub fn arn(&self) -> &str {
        match self {
            RoleOutcome::Unchanged(arn) | RoleOutcome::Created(arn) | RoleOutcome::Recreated(arn) => {
                arn
            }
        }
    }
}

pub fn ensure_role(
    store: &dyn RoleStore,
    spec: &DeploymentSpec,
    replace: bool,
) -> Result<RoleOutcome, DeployError> {
    let role_name = &spec.role_name;

    if let Some(existing) = store.lookup(role_name).map_err(DeployError::Api)? {
        if !replace {
            eprintln!("role '{role_name}' already exists, leaving it unchanged");
            return Ok(RoleOutcome::Unchanged(existing.arn));
        }

        // IAM refuses to delete a role while policies are still attached.
        store
            .delete_inline_policy(role_name, policy::ACCESS_POLICY_NAME)
            .map_err(DeployError::Api)?;
        store
            .detach_managed_policy(role_name, policy::BASIC_EXECUTION_POLICY_ARN)
            .map_err(DeployError::Api)?;
        store.delete(role_name).map_err(DeployError::Api)?;
        eprintln!("deleted role '{role_name}' for recreation");

        let record = create_with_policies(store, spec)?;
        return Ok(RoleOutcome::Recreated(record.arn));
    }

    let record = create_with_policies(store, spec)?;
    Ok(RoleOutcome::Created(record.arn))
}

fn create_with_policies(
    store: &dyn RoleStore,
    spec: &DeploymentSpec,
) -> Result<RoleRecord, DeployError> {
    let role_name = &spec.role_name;
    let record = store
        .create(role_name, &policy::trust_policy_document())
        .map_err(DeployError::Api)?;
    eprintln!("created role '{role_name}'");

    store
        .attach_managed_policy(role_name, policy::BASIC_EXECUTION_POLICY_ARN)
        .map_err(DeployError::Api)?;

    let document = policy::access_policy_document(spec.s3_buckets.as_deref());
    store
        .put_inline_policy(role_name, policy::ACCESS_POLICY_NAME, &document)
        .map_err(DeployError::Api)?;
    match spec.s3_buckets.as_deref() {
        Some(buckets) if !buckets.is_empty() => {
            eprintln!("attached S3 access policy scoped to {} bucket(s)", buckets.len())
        }
        _ => eprintln!("attached permissive S3 access policy (no bucket allowlist configured)"),
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct FakeRoleStore {
        existing: Option<RoleRecord>,
        created_arn: String,
        calls: Mutex<Vec<String>>,
        documents: Mutex<Vec<String>>,
    }

    impl FakeRoleStore {
        fn new(existing: Option<RoleRecord>, created_arn: &str) -> Self {
            Self {
                existing,
                created_arn: created_arn.to_string(),
                calls: Mutex::new(Vec::new()),
                documents: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("poisoned mutex").clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().expect("poisoned mutex").push(call.into());
        }
    }

    impl RoleStore for FakeRoleStore {
        fn lookup(&self, _role_name: &str) -> Result<Option<RoleRecord>, String> {
            self.record("lookup");
            Ok(self.existing.clone())
        }

        fn create(&self, role_name: &str, _trust_policy: &str) -> Result<RoleRecord, String> {
            self.record("create");
            Ok(RoleRecord {
                name: role_name.to_string(),
                arn: self.created_arn.clone(),
            })
        }

        fn delete(&self, _role_name: &str) -> Result<(), String> {
            self.record("delete");
            Ok(())
        }

        fn attach_managed_policy(&self, _role_name: &str, policy_arn: &str) -> Result<(), String> {
            self.record(format!("attach:{policy_arn}"));
            Ok(())
        }

        fn detach_managed_policy(&self, _role_name: &str, _policy_arn: &str) -> Result<(), String> {
            self.record("detach");
            Ok(())
        }

        fn put_inline_policy(
            &self,
            _role_name: &str,
            policy_name: &str,
            document: &str,
        ) -> Result<(), String> {
            self.record(format!("put_inline:{policy_name}"));
            self.documents
                .lock()
                .expect("poisoned mutex")
                .push(document.to_string());
            Ok(())
        }

        fn delete_inline_policy(&self, _role_name: &str, _policy_name: &str) -> Result<(), String> {
            self.record("delete_inline");
            Ok(())
        }
    }

    fn spec(buckets: Option<Vec<&str>>) -> DeploymentSpec {
        serde_json::from_value(serde_json::json!({
            "function_name": "audio-transcoder",
            "role_name": "audio-transcoder-exec",
            "s3_buckets": buckets,
        }))
        .expect("spec fixture should deserialize")
    }

    const EXISTING_ARN: &str = "arn:aws:iam::123456789012:role/audio-transcoder-exec";
    const NEW_ARN: &str = "arn:aws:iam::123456789012:role/audio-transcoder-exec-v2";

    fn existing_record() -> RoleRecord {
        RoleRecord {
            name: "audio-transcoder-exec".to_string(),
            arn: EXISTING_ARN.to_string(),
        }
    }

    #[test]
    fn existing_role_without_replace_is_left_untouched() {
        let store = FakeRoleStore::new(Some(existing_record()), NEW_ARN);

        let outcome = ensure_role(&store, &spec(None), false).expect("ensure should succeed");

        assert_eq!(outcome, RoleOutcome::Unchanged(EXISTING_ARN.to_string()));
        assert_eq!(store.calls(), vec!["lookup"]);
    }

    #[test]
    fn absent_role_is_created_with_both_policies() {
        let store = FakeRoleStore::new(None, NEW_ARN);

        let outcome = ensure_role(&store, &spec(None), false).expect("ensure should succeed");

        assert_eq!(outcome, RoleOutcome::Created(NEW_ARN.to_string()));
        assert_eq!(
            store.calls(),
            vec![
                "lookup".to_string(),
                "create".to_string(),
                format!("attach:{}", policy::BASIC_EXECUTION_POLICY_ARN),
                format!("put_inline:{}", policy::ACCESS_POLICY_NAME),
            ]
        );
    }

    #[test]
    fn replace_removes_policies_before_deleting_the_role() {
        let store = FakeRoleStore::new(Some(existing_record()), NEW_ARN);

        let outcome = ensure_role(&store, &spec(None), true).expect("ensure should succeed");

        assert_eq!(outcome, RoleOutcome::Recreated(NEW_ARN.to_string()));
        let calls = store.calls();
        assert_eq!(&calls[..4], &["lookup", "delete_inline", "detach", "delete"]);
        assert!(calls[4..].starts_with(&["create".to_string()]));
    }

    #[test]
    fn recreated_role_reports_the_new_identity() {
        let store = FakeRoleStore::new(Some(existing_record()), NEW_ARN);

        let outcome = ensure_role(&store, &spec(None), true).expect("ensure should succeed");

        assert_ne!(outcome.arn(), EXISTING_ARN);
        assert_eq!(outcome.arn(), NEW_ARN);
    }

    #[test]
    fn bucket_allowlist_scopes_the_inline_policy() {
        let store = FakeRoleStore::new(None, NEW_ARN);

        ensure_role(&store, &spec(Some(vec!["audio-drop"])), false)
            .expect("ensure should succeed");

        let documents = store.documents.lock().expect("poisoned mutex");
        assert!(documents[0].contains("arn:aws:s3:::audio-drop"));
        assert!(!documents[0].contains("\"s3:*\""));
    }

    #[test]
    fn lookup_failures_other_than_absence_are_fatal() {
        struct BrokenStore;
        impl RoleStore for BrokenStore {
            fn lookup(&self, _role_name: &str) -> Result<Option<RoleRecord>, String> {
                Err("access denied".to_string())
            }
            fn create(&self, _: &str, _: &str) -> Result<RoleRecord, String> {
                panic!("must not create after a failed lookup");
            }
            fn delete(&self, _: &str) -> Result<(), String> {
                unreachable!()
            }
            fn attach_managed_policy(&self, _: &str, _: &str) -> Result<(), String> {
                unreachable!()
            }
            fn detach_managed_policy(&self, _: &str, _: &str) -> Result<(), String> {
                unreachable!()
            }
            fn put_inline_policy(&self, _: &str, _: &str, _: &str) -> Result<(), String> {
                unreachable!()
            }
            fn delete_inline_policy(&self, _: &str, _: &str) -> Result<(), String> {
                unreachable!()
            }
        }

        let result = ensure_role(&BrokenStore, &spec(None), false);
        assert!(matches!(result, Err(DeployError::Api(_))));
    }
}
