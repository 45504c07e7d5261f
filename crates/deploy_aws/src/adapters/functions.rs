use std::collections::{BTreeMap, HashMap};

use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{
    Environment, EphemeralStorage, FunctionCode, LastUpdateStatus, Runtime,
};

use super::wait_for;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSettings {
    pub role_arn: String,
    pub handler: String,
    pub timeout_seconds: i32,
    pub memory_mb: i32,
    pub ephemeral_storage_mb: i32,
    pub environment: BTreeMap<String, String>,
}

/// Remote update lifecycle as observed through the status probe. The SDK's
/// `InProgress` maps to `Pending`; anything unrecognized stays `Pending`
/// so the deployer keeps waiting rather than assuming success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Pending,
    Successful,
    Failed,
}

/// Function lifecycle surface used by the deployer. At most one remote
/// update may be outstanding per function; the deployer enforces the wait
/// between `update_settings` and `update_code`.
pub trait FunctionApi {
    fn lookup(&self, function_name: &str) -> Result<Option<FunctionRecord>, String>;
    fn create(
        &self,
        function_name: &str,
        settings: &FunctionSettings,
        code: &[u8],
    ) -> Result<FunctionRecord, String>;
    fn update_settings(&self, function_name: &str, settings: &FunctionSettings)
        -> Result<(), String>;
    fn update_code(&self, function_name: &str, code: &[u8]) -> Result<(), String>;
    fn update_status(&self, function_name: &str) -> Result<UpdateStatus, String>;
}

pub struct AwsFunctionApi {
    client: aws_sdk_lambda::Client,
}

impl AwsFunctionApi {
    pub const RUNTIME: Runtime = Runtime::Python311;

    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }

    fn environment(settings: &FunctionSettings) -> Environment {
        let variables: HashMap<String, String> = settings
            .environment
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Environment::builder().set_variables(Some(variables)).build()
    }

    fn ephemeral_storage(settings: &FunctionSettings) -> Result<EphemeralStorage, String> {
        EphemeralStorage::builder()
            .size(settings.ephemeral_storage_mb)
            .build()
            .map_err(|error| format!("invalid ephemeral storage size: {error}"))
    }
}

impl FunctionApi for AwsFunctionApi {
    fn lookup(&self, function_name: &str) -> Result<Option<FunctionRecord>, String> {
        match wait_for(self.client.get_function().function_name(function_name).send()) {
            Ok(output) => {
                let configuration = output.configuration().ok_or_else(|| {
                    format!("get-function response for '{function_name}' carried no configuration")
                })?;
                let arn = configuration.function_arn().ok_or_else(|| {
                    format!("get-function response for '{function_name}' carried no ARN")
                })?;
                Ok(Some(FunctionRecord {
                    name: configuration
                        .function_name()
                        .unwrap_or(function_name)
                        .to_string(),
                    arn: arn.to_string(),
                }))
            }
            Err(error) => {
                let service_error = error.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    Ok(None)
                } else {
                    Err(format!(
                        "failed to look up function '{function_name}': {service_error}"
                    ))
                }
            }
        }
    }

    fn create(
        &self,
        function_name: &str,
        settings: &FunctionSettings,
        code: &[u8],
    ) -> Result<FunctionRecord, String> {
        let output = wait_for(
            self.client
                .create_function()
                .function_name(function_name)
                .runtime(Self::RUNTIME)
                .role(&settings.role_arn)
                .handler(&settings.handler)
                .code(
                    FunctionCode::builder()
                        .zip_file(Blob::new(code.to_vec()))
                        .build(),
                )
                .timeout(settings.timeout_seconds)
                .memory_size(settings.memory_mb)
                .ephemeral_storage(Self::ephemeral_storage(settings)?)
                .environment(Self::environment(settings))
                .publish(true)
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to create function '{function_name}': {}",
                error.into_service_error()
            )
        })?;
        Ok(FunctionRecord {
            name: output
                .function_name()
                .unwrap_or(function_name)
                .to_string(),
            arn: output
                .function_arn()
                .ok_or_else(|| {
                    format!("create-function response for '{function_name}' carried no ARN")
                })?
                .to_string(),
        })
    }

    fn update_settings(
        &self,
        function_name: &str,
        settings: &FunctionSettings,
    ) -> Result<(), String> {
        wait_for(
            self.client
                .update_function_configuration()
                .function_name(function_name)
                .role(&settings.role_arn)
                .handler(&settings.handler)
                .timeout(settings.timeout_seconds)
                .memory_size(settings.memory_mb)
                .ephemeral_storage(Self::ephemeral_storage(settings)?)
                .environment(Self::environment(settings))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            format!(
                "failed to update configuration of '{function_name}': {}",
                error.into_service_error()
            )
        })
    }

    fn update_code(&self, function_name: &str, code: &[u8]) -> Result<(), String> {
        wait_for(
            self.client
                .update_function_code()
                .function_name(function_name)
                .zip_file(Blob::new(code.to_vec()))
                .publish(true)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            format!(
                "failed to update code of '{function_name}': {}",
                error.into_service_error()
            )
        })
    }

    fn update_status(&self, function_name: &str) -> Result<UpdateStatus, String> {
        let output = wait_for(self.client.get_function().function_name(function_name).send())
            .map_err(|error| {
                format!(
                    "failed to read update status of '{function_name}': {}",
                    error.into_service_error()
                )
            })?;
        let status = output
            .configuration()
            .and_then(|configuration| configuration.last_update_status());
        Ok(match status {
            Some(LastUpdateStatus::Successful) => UpdateStatus::Successful,
            Some(LastUpdateStatus::Failed) => UpdateStatus::Failed,
            _ => UpdateStatus::Pending,
        })
    }
}
