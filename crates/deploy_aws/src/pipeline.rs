//! The deployment pipeline: Role → Package → Deploy → Trigger.
//!
//! Strictly sequential; data flows forward only (role ARN, archive path,
//! function ARN). All paths and the caller identity are resolved once by
//! the caller and threaded through explicitly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use deploy_core::arn;
use deploy_core::config::{self, CONFIG_FILE_NAME, ENV_FILE_NAME};
use deploy_core::envfile;

use crate::adapters::functions::FunctionApi;
use crate::adapters::notifications::NotificationApi;
use crate::adapters::roles::RoleStore;
use crate::deploy::{self, DeployOutcome};
use crate::error::DeployError;
use crate::package::{self, ArchiveOutcome, DependencyResolver};
use crate::role::{self, RoleOutcome};
use crate::trigger::{self, TriggerOutcome};

pub struct RunPaths {
    /// Holds `config.json`, `my.env`, `requirements.txt`, and the produced
    /// archive.
    pub working_dir: PathBuf,
    /// Holds the shared library files named in `extra_files`.
    pub library_dir: PathBuf,
}

pub struct CallerIdentity {
    pub region: String,
    pub account_id: String,
}

pub struct Backends<'a> {
    pub roles: &'a dyn RoleStore,
    pub functions: &'a dyn FunctionApi,
    pub notifications: &'a dyn NotificationApi,
    pub dependencies: &'a dyn DependencyResolver,
}

/// Per-stage outcomes of one run, mostly of interest to tests and logging.
pub struct RunReport {
    pub role: RoleOutcome,
    pub archive: ArchiveOutcome,
    pub function: DeployOutcome,
    pub trigger: TriggerOutcome,
}

pub fn run(
    paths: &RunPaths,
    identity: &CallerIdentity,
    backends: &Backends<'_>,
    replace: bool,
    sleep: &mut dyn FnMut(Duration),
) -> Result<RunReport, DeployError> {
    let spec = config::load_spec(&paths.working_dir.join(CONFIG_FILE_NAME))?;

    step(&format!("Provision execution role '{}'", spec.role_name));
    let role = role::ensure_role(backends.roles, &spec, replace)?;

    step(&format!("Package code archive for '{}'", spec.function_name));
    let archive = package::build_archive(
        &spec,
        &paths.working_dir,
        &paths.library_dir,
        backends.dependencies,
        replace,
    )?;

    step(&format!("Deploy function '{}'", spec.function_name));
    let code = fs::read(archive.path()).map_err(|error| {
        DeployError::Io(format!(
            "failed to read archive '{}': {error}",
            archive.path().display()
        ))
    })?;
    let environment = load_environment(&paths.working_dir)?;
    let function = deploy::deploy_function(
        backends.functions,
        &spec,
        role.arn(),
        &code,
        environment,
        replace,
        sleep,
    )?;

    step(&format!("Configure bucket trigger for '{}'", spec.function_name));
    let function_arn = arn::function_arn(
        &identity.region,
        &identity.account_id,
        &spec.function_name,
    );
    let trigger = trigger::configure_trigger(backends.notifications, &spec, &function_arn, replace)?;

    Ok(RunReport {
        role,
        archive,
        function,
        trigger,
    })
}

fn load_environment(working_dir: &Path) -> Result<BTreeMap<String, String>, DeployError> {
    let path = working_dir.join(ENV_FILE_NAME);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = fs::read_to_string(&path).map_err(|error| {
        DeployError::Io(format!(
            "failed to read env file '{}': {error}",
            path.display()
        ))
    })?;
    let variables = envfile::parse_env(&contents);
    if !variables.is_empty() {
        eprintln!(
            "loaded {} environment variable(s) from '{}'",
            variables.len(),
            path.display()
        );
    }
    Ok(variables)
}

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}
