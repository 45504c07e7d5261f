use aws_sdk_s3::types::{
    Event, FilterRule, FilterRuleName, LambdaFunctionConfiguration, NotificationConfiguration,
    NotificationConfigurationFilter, S3KeyFilter,
};

use deploy_core::notification::BucketBinding;

use super::wait_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    /// The permission statement already exists; the desired end state is in
    /// place, so this is success, not an error.
    AlreadyGranted,
}

/// Bucket notification surface used by the trigger binder. The remote API
/// takes the complete lambda-binding set per write.
pub trait NotificationApi {
    fn bucket_bindings(&self, bucket: &str) -> Result<Vec<BucketBinding>, String>;
    fn replace_bucket_bindings(
        &self,
        bucket: &str,
        bindings: &[BucketBinding],
    ) -> Result<(), String>;
    fn grant_invoke(
        &self,
        function_name: &str,
        statement_id: &str,
        bucket_arn: &str,
    ) -> Result<GrantOutcome, String>;
}

pub struct AwsNotificationApi {
    s3: aws_sdk_s3::Client,
    lambda: aws_sdk_lambda::Client,
}

impl AwsNotificationApi {
    pub fn new(s3: aws_sdk_s3::Client, lambda: aws_sdk_lambda::Client) -> Self {
        Self { s3, lambda }
    }
}

impl NotificationApi for AwsNotificationApi {
    fn bucket_bindings(&self, bucket: &str) -> Result<Vec<BucketBinding>, String> {
        let output = wait_for(
            self.s3
                .get_bucket_notification_configuration()
                .bucket(bucket)
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to read notification configuration of bucket '{bucket}': {}",
                error.into_service_error()
            )
        })?;
        Ok(output
            .lambda_function_configurations()
            .iter()
            .map(binding_from_configuration)
            .collect())
    }

    fn replace_bucket_bindings(
        &self,
        bucket: &str,
        bindings: &[BucketBinding],
    ) -> Result<(), String> {
        let configurations = bindings
            .iter()
            .map(configuration_from_binding)
            .collect::<Result<Vec<_>, _>>()?;
        wait_for(
            self.s3
                .put_bucket_notification_configuration()
                .bucket(bucket)
                .notification_configuration(
                    NotificationConfiguration::builder()
                        .set_lambda_function_configurations(Some(configurations))
                        .build(),
                )
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            format!(
                "failed to write notification configuration of bucket '{bucket}': {}",
                error.into_service_error()
            )
        })
    }

    fn grant_invoke(
        &self,
        function_name: &str,
        statement_id: &str,
        bucket_arn: &str,
    ) -> Result<GrantOutcome, String> {
        match wait_for(
            self.lambda
                .add_permission()
                .function_name(function_name)
                .statement_id(statement_id)
                .action("lambda:InvokeFunction")
                .principal("s3.amazonaws.com")
                .source_arn(bucket_arn)
                .send(),
        ) {
            Ok(_) => Ok(GrantOutcome::Granted),
            Err(error) => {
                let service_error = error.into_service_error();
                if service_error.is_resource_conflict_exception() {
                    Ok(GrantOutcome::AlreadyGranted)
                } else {
                    Err(format!(
                        "failed to grant invoke permission on '{function_name}': {service_error}"
                    ))
                }
            }
        }
    }
}

fn binding_from_configuration(configuration: &LambdaFunctionConfiguration) -> BucketBinding {
    let mut prefix = None;
    let mut suffix = None;
    if let Some(rules) = configuration
        .filter()
        .and_then(|filter| filter.key())
        .map(|key| key.filter_rules())
    {
        for rule in rules {
            match rule.name() {
                Some(FilterRuleName::Prefix) => prefix = rule.value().map(str::to_string),
                Some(FilterRuleName::Suffix) => suffix = rule.value().map(str::to_string),
                _ => {}
            }
        }
    }
    BucketBinding {
        id: configuration.id().map(str::to_string),
        function_arn: configuration.lambda_function_arn().to_string(),
        events: configuration
            .events()
            .iter()
            .map(|event| event.as_str().to_string())
            .collect(),
        prefix,
        suffix,
    }
}

fn configuration_from_binding(
    binding: &BucketBinding,
) -> Result<LambdaFunctionConfiguration, String> {
    let mut filter_rules = Vec::new();
    if let Some(prefix) = binding.prefix.as_deref() {
        filter_rules.push(
            FilterRule::builder()
                .name(FilterRuleName::Prefix)
                .value(prefix)
                .build(),
        );
    }
    if let Some(suffix) = binding.suffix.as_deref() {
        filter_rules.push(
            FilterRule::builder()
                .name(FilterRuleName::Suffix)
                .value(suffix)
                .build(),
        );
    }

    let mut builder = LambdaFunctionConfiguration::builder()
        .set_id(binding.id.clone())
        .lambda_function_arn(&binding.function_arn)
        .set_events(Some(
            binding
                .events
                .iter()
                .map(|event| Event::from(event.as_str()))
                .collect(),
        ));
    if !filter_rules.is_empty() {
        builder = builder.filter(
            NotificationConfigurationFilter::builder()
                .key(
                    S3KeyFilter::builder()
                        .set_filter_rules(Some(filter_rules))
                        .build(),
                )
                .build(),
        );
    }
    builder.build().map_err(|error| {
        format!(
            "invalid notification configuration for '{}': {error}",
            binding.function_arn
        )
    })
}
