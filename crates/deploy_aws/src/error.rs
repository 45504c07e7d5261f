use std::fmt;
use std::time::Duration;

use deploy_core::config::ConfigError;

/// Fatal pipeline errors. Expected conditions (a role or function that does
/// not exist yet, an invoke permission that is already in place) never reach
/// this type; adapters convert them into create-path or no-op outcomes at
/// the point of occurrence.
#[derive(Debug)]
pub enum DeployError {
    Config(ConfigError),
    Io(String),
    Api(String),
    DependencyResolution(String),
    /// The remote platform reported a failed asynchronous update. Not
    /// retried; the remote outcome is known and negative.
    UpdateFailed { function: String },
    /// The poll budget ran out with the update still pending. Distinct from
    /// `UpdateFailed`: the remote outcome is unknown.
    UpdateTimeout {
        function: String,
        attempts: u32,
        interval: Duration,
    },
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::Config(error) => write!(f, "{error}"),
            DeployError::Io(message) => write!(f, "{message}"),
            DeployError::Api(message) => write!(f, "{message}"),
            DeployError::DependencyResolution(message) => {
                write!(f, "dependency resolution failed: {message}")
            }
            DeployError::UpdateFailed { function } => {
                write!(f, "remote update of function '{function}' failed")
            }
            DeployError::UpdateTimeout {
                function,
                attempts,
                interval,
            } => write!(
                f,
                "function '{function}' was not ready after {attempts} status checks over {}s",
                interval.as_secs() * u64::from(*attempts)
            ),
        }
    }
}

impl From<ConfigError> for DeployError {
    fn from(error: ConfigError) -> Self {
        DeployError::Config(error)
    }
}
