//! Bucket notification binding for the deployed function.

use deploy_core::arn;
use deploy_core::config::DeploymentSpec;
use deploy_core::notification;

use crate::adapters::notifications::{GrantOutcome, NotificationApi};
use crate::error::DeployError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The config carries no trigger bucket or suffixes; the stage is optional.
    NotConfigured,
    /// The bucket already notifies this function and `replace` was not
    /// requested; no permission grant or write was issued.
    AlreadyBound,
    Bound { rules: usize },
}

pub fn statement_id(bucket: &str) -> String {
    format!("S3InvokePermission-{bucket}")
}

pub fn configure_trigger(
    api: &dyn NotificationApi,
    spec: &DeploymentSpec,
    function_arn: &str,
    replace: bool,
) -> Result<TriggerOutcome, DeployError> {
    let Some((bucket, suffixes)) = spec.trigger() else {
        eprintln!("no trigger configuration present, skipping trigger setup");
        return Ok(TriggerOutcome::NotConfigured);
    };
    let function_name = &spec.function_name;

    let existing = api.bucket_bindings(bucket).map_err(DeployError::Api)?;
    if notification::has_binding_for(&existing, function_arn) && !replace {
        eprintln!(
            "bucket '{bucket}' already notifies function '{function_name}', leaving bindings unchanged"
        );
        return Ok(TriggerOutcome::AlreadyBound);
    }

    match api
        .grant_invoke(function_name, &statement_id(bucket), &arn::bucket_arn(bucket))
        .map_err(DeployError::Api)?
    {
        GrantOutcome::Granted => {
            eprintln!("granted bucket '{bucket}' permission to invoke '{function_name}'")
        }
        GrantOutcome::AlreadyGranted => {
            eprintln!("invoke permission for '{function_name}' already in place")
        }
    }

    let desired = notification::reconcile_bindings(&existing, function_arn, suffixes);
    api.replace_bucket_bindings(bucket, &desired)
        .map_err(DeployError::Api)?;
    eprintln!(
        "configured {} suffix trigger(s) for '{function_name}' on bucket '{bucket}'",
        suffixes.len()
    );
    Ok(TriggerOutcome::Bound {
        rules: suffixes.len(),
    })
}
