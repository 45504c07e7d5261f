use std::path::PathBuf;
use std::process::exit;
use std::thread;
use std::time::Duration;

use clap::Parser;

use deploy_aws::adapters::functions::AwsFunctionApi;
use deploy_aws::adapters::notifications::AwsNotificationApi;
use deploy_aws::adapters::roles::AwsRoleStore;
use deploy_aws::package::PipResolver;
use deploy_aws::pipeline::{self, Backends, CallerIdentity, RunPaths};

#[derive(Parser)]
#[command(
    name = "lambda-deploy",
    about = "Package and deploy an AWS Lambda function from a declarative config",
    long_about = "Provisions the execution role, packages the code archive,\n\
                  creates or converges the function, and binds S3 bucket\n\
                  triggers, idempotently from config.json."
)]
struct Cli {
    /// Directory holding config.json, my.env, requirements.txt, and the
    /// produced archive
    #[arg(long, default_value = ".")]
    working_dir: PathBuf,
    /// Directory holding the shared library files named in `extra_files`
    /// (defaults to `<working-dir>/lib`)
    #[arg(long)]
    library_dir: Option<PathBuf>,
    /// Recreate resources that already exist instead of skipping them
    #[arg(long)]
    replace: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let paths = RunPaths {
        library_dir: cli
            .library_dir
            .unwrap_or_else(|| cli.working_dir.join("lib")),
        working_dir: cli.working_dir,
    };

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let Some(region) = config.region().map(|region| region.to_string()) else {
        eprintln!("error: no AWS region configured; set AWS_REGION or a profile region");
        exit(1);
    };
    let account_id = match caller_account(&config).await {
        Ok(account_id) => account_id,
        Err(message) => {
            eprintln!("error: {message}");
            exit(1);
        }
    };

    let roles = AwsRoleStore::new(aws_sdk_iam::Client::new(&config));
    let functions = AwsFunctionApi::new(aws_sdk_lambda::Client::new(&config));
    let notifications = AwsNotificationApi::new(
        aws_sdk_s3::Client::new(&config),
        aws_sdk_lambda::Client::new(&config),
    );
    let backends = Backends {
        roles: &roles,
        functions: &functions,
        notifications: &notifications,
        dependencies: &PipResolver,
    };
    let identity = CallerIdentity { region, account_id };

    let mut sleep = |interval: Duration| thread::sleep(interval);
    match pipeline::run(&paths, &identity, &backends, cli.replace, &mut sleep) {
        Ok(_) => eprintln!("\nDeployment complete."),
        Err(error) => {
            eprintln!("\nerror: {error}");
            exit(1);
        }
    }
}

async fn caller_account(config: &aws_config::SdkConfig) -> Result<String, String> {
    let client = aws_sdk_sts::Client::new(config);
    let identity = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|error| {
            format!(
                "failed to resolve caller identity: {}",
                error.into_service_error()
            )
        })?;
    identity
        .account()
        .map(str::to_string)
        .ok_or_else(|| "caller identity response carried no account id".to_string())
}
