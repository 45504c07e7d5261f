//! Function creation and convergence.
//!
//! Updating an existing function is two-phase: push the configuration,
//! wait for the remote update machine to settle, then push the code. The
//! platform serializes updates per function and rejects a second update
//! while one is in flight, so the wait is a required barrier rather than
//! an optimization.

use std::collections::BTreeMap;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use deploy_core::config::DeploymentSpec;
use deploy_core::wait::{poll_until_settled, PollBudget, PollOutcome};

use crate::adapters::functions::{FunctionApi, FunctionRecord, FunctionSettings, UpdateStatus};
use crate::error::DeployError;

pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const STATUS_POLL_ATTEMPTS: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Created(FunctionRecord),
    /// Function already existed and `replace` was not requested; nothing
    /// was pushed.
    Skipped(FunctionRecord),
    Updated(FunctionRecord),
}

impl DeployOutcome {
    pub fn record(&self) -> &FunctionRecord {
        match self {
            DeployOutcome::Created(record)
            | DeployOutcome::Skipped(record)
            | DeployOutcome::Updated(record) => record,
        }
    }
}

pub fn deploy_function(
    api: &dyn FunctionApi,
    spec: &DeploymentSpec,
    role_arn: &str,
    code: &[u8],
    environment: BTreeMap<String, String>,
    replace: bool,
    sleep: &mut dyn FnMut(Duration),
) -> Result<DeployOutcome, DeployError> {
    let function_name = &spec.function_name;
    let settings = FunctionSettings {
        role_arn: role_arn.to_string(),
        handler: spec.handler()?,
        timeout_seconds: spec.timeout_seconds()?,
        memory_mb: spec.memory_mb()?,
        ephemeral_storage_mb: spec.ephemeral_storage_mb()?,
        environment,
    };

    let Some(existing) = api.lookup(function_name).map_err(DeployError::Api)? else {
        let record = api
            .create(function_name, &settings, code)
            .map_err(DeployError::Api)?;
        eprintln!("created function '{function_name}' and published its first version");
        return Ok(DeployOutcome::Created(record));
    };

    if !replace {
        eprintln!("function '{function_name}' already exists, skipping update");
        return Ok(DeployOutcome::Skipped(existing));
    }

    api.update_settings(function_name, &settings)
        .map_err(DeployError::Api)?;
    eprintln!("pushed configuration update for '{function_name}'");

    wait_until_ready(api, function_name, sleep)?;

    api.update_code(function_name, code).map_err(DeployError::Api)?;
    eprintln!("pushed code update for '{function_name}' and published a new version");
    Ok(DeployOutcome::Updated(existing))
}

fn wait_until_ready(
    api: &dyn FunctionApi,
    function_name: &str,
    sleep: &mut dyn FnMut(Duration),
) -> Result<(), DeployError> {
    let budget = PollBudget::new(STATUS_POLL_INTERVAL, STATUS_POLL_ATTEMPTS);
    let bar = ProgressBar::new(u64::from(budget.max_attempts));
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );
    bar.set_message(format!("waiting for '{function_name}' to settle"));

    let result = poll_until_settled(
        budget,
        || match api.update_status(function_name).map_err(DeployError::Api)? {
            UpdateStatus::Successful => Ok(Some(())),
            UpdateStatus::Failed => Err(DeployError::UpdateFailed {
                function: function_name.to_string(),
            }),
            UpdateStatus::Pending => {
                bar.inc(1);
                Ok(None)
            }
        },
        |interval| sleep(interval),
    );
    bar.finish_and_clear();

    match result? {
        PollOutcome::Settled(()) => Ok(()),
        PollOutcome::TimedOut { attempts } => Err(DeployError::UpdateTimeout {
            function: function_name.to_string(),
            attempts,
            interval: budget.interval,
        }),
    }
}
