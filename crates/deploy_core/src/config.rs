//! Desired-state configuration for a single deployment run.
//!
//! The descriptor is read once from `config.json` in the working directory
//! and stays immutable for the run. Only the invariants that hold for every
//! pipeline stage are checked at load time; everything else is surfaced
//! through accessors that fail when a stage actually needs the field, so a
//! partial config stays valid for a partial pipeline.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_FILE_NAME: &str = "my.env";
pub const DEPENDENCY_MANIFEST_NAME: &str = "requirements.txt";

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    InvalidFormat(String),
    MissingField(&'static str),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(message) => write!(f, "{message}"),
            ConfigError::InvalidFormat(message) => write!(f, "{message}"),
            ConfigError::MissingField(field) => {
                write!(f, "config field '{field}' is required for this step")
            }
            ConfigError::InvalidValue(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DeploymentSpec {
    pub function_name: String,
    pub role_name: String,
    #[serde(default)]
    entry_file: Option<String>,
    #[serde(default)]
    entry_function: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<i32>,
    #[serde(default)]
    memory_mb: Option<i32>,
    #[serde(default)]
    ephemeral_storage_mb: Option<i32>,
    #[serde(default)]
    pub s3_buckets: Option<Vec<String>>,
    #[serde(default)]
    trigger_bucket: Option<String>,
    #[serde(default)]
    trigger_suffixes: Option<Vec<String>>,
    #[serde(default)]
    extra_files: Option<Vec<String>>,
}

impl DeploymentSpec {
    /// Handler reference in the `<module>.<function>` form the platform
    /// expects, derived from the entry file's stem.
    pub fn handler(&self) -> Result<String, ConfigError> {
        let entry_file = self.entry_file()?;
        let entry_function = self
            .entry_function
            .as_deref()
            .ok_or(ConfigError::MissingField("entry_function"))?;
        let stem = Path::new(entry_file)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "entry_file '{entry_file}' has no usable file name"
                ))
            })?;
        Ok(format!("{stem}.{entry_function}"))
    }

    pub fn entry_file(&self) -> Result<&str, ConfigError> {
        self.entry_file
            .as_deref()
            .ok_or(ConfigError::MissingField("entry_file"))
    }

    pub fn timeout_seconds(&self) -> Result<i32, ConfigError> {
        self.timeout_seconds
            .ok_or(ConfigError::MissingField("timeout_seconds"))
    }

    pub fn memory_mb(&self) -> Result<i32, ConfigError> {
        self.memory_mb.ok_or(ConfigError::MissingField("memory_mb"))
    }

    pub fn ephemeral_storage_mb(&self) -> Result<i32, ConfigError> {
        self.ephemeral_storage_mb
            .ok_or(ConfigError::MissingField("ephemeral_storage_mb"))
    }

    /// Trigger configuration, present only when both the bucket and at
    /// least one suffix are configured. Trigger setup is optional; callers
    /// skip the stage entirely on `None`.
    pub fn trigger(&self) -> Option<(&str, &[String])> {
        let bucket = self.trigger_bucket.as_deref()?;
        let suffixes = self.trigger_suffixes.as_deref()?;
        if suffixes.is_empty() {
            return None;
        }
        Some((bucket, suffixes))
    }

    pub fn extra_files(&self) -> &[String] {
        self.extra_files.as_deref().unwrap_or_default()
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.function_name)
    }
}

pub fn load_spec(path: &Path) -> Result<DeploymentSpec, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|error| {
        ConfigError::Io(format!(
            "failed to read config file '{}': {error}",
            path.display()
        ))
    })?;

    let spec: DeploymentSpec = serde_json::from_str(&contents).map_err(|error| {
        ConfigError::InvalidFormat(format!("invalid config file '{}': {error}", path.display()))
    })?;

    validate(&spec)?;
    Ok(spec)
}

fn validate(spec: &DeploymentSpec) -> Result<(), ConfigError> {
    if spec.function_name.trim().is_empty() {
        return Err(ConfigError::InvalidValue(
            "function_name must not be empty".to_string(),
        ));
    }
    if spec.role_name.trim().is_empty() {
        return Err(ConfigError::InvalidValue(
            "role_name must not be empty".to_string(),
        ));
    }
    if let Some(bucket) = spec.trigger_bucket.as_deref() {
        let has_suffixes = spec
            .trigger_suffixes
            .as_deref()
            .map(|suffixes| !suffixes.is_empty())
            .unwrap_or(false);
        if !has_suffixes {
            return Err(ConfigError::InvalidValue(format!(
                "trigger_bucket '{bucket}' is set but trigger_suffixes is empty"
            )));
        }
    }
    Ok(())
}
