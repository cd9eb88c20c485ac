//! Command-line interface.

pub mod logging;
pub mod output;
pub mod run;

use clap::{CommandFactory, Parser};

use crate::core::limits::LimitRequest;
use crate::core::types::{LaunchRequest, ProviderLocator};
use crate::error::Result;

pub use logging::LogMode;

/// Launcher - prepares the environment for the sub-process and launches it.
#[derive(Parser, Debug)]
#[command(
    name = "launcher",
    about = "Prepares the environment for the sub-process, launches, and manages it",
    version,
    override_usage = "launcher [OPTIONS] /path/to/the/subprocess [ARGS]..."
)]
pub struct Cli {
    /// Read values from AWS secret manager (ARN) and inject them into the environment
    #[arg(
        long,
        env = "AWS_SECRET_ARN",
        value_name = "ARN",
        value_delimiter = ',',
        help_heading = "Running"
    )]
    pub aws_secret_arn: Vec<String>,

    /// Read secrets from Azure key vault and inject them into the environment
    #[arg(
        long,
        env = "AZURE_KEY_VAULT_NAME",
        value_name = "NAME",
        value_delimiter = ',',
        help_heading = "Running"
    )]
    pub azure_key_vault_name: Vec<String>,

    /// Set soft-limit on number of open files [default: don't change]
    #[arg(
        long,
        env = "ULIMIT_SOFT",
        value_name = "NUMBER",
        default_value_t = -1,
        hide_default_value = true,
        allow_negative_numbers = true,
        help_heading = "Running"
    )]
    pub ulimit_soft: i64,

    /// Set hard-limit on number of open files [default: don't change]
    #[arg(
        long,
        env = "ULIMIT_HARD",
        value_name = "NUMBER",
        default_value_t = -1,
        hide_default_value = true,
        allow_negative_numbers = true,
        help_heading = "Running"
    )]
    pub ulimit_hard: i64,

    /// Logging level
    #[arg(long, env = "LOG_LEVEL", default_value = "info", help_heading = "Logging")]
    pub log_level: String,

    /// Logging mode
    #[arg(
        long,
        env = "LOG_MODE",
        value_enum,
        ignore_case = true,
        default_value_t = LogMode::Prod,
        help_heading = "Logging"
    )]
    pub log_mode: LogMode,

    /// Program to launch, followed by its arguments
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Secret locators in override order: AWS flags first, then Azure flags.
    pub fn locators(&self) -> Vec<ProviderLocator> {
        self.aws_secret_arn
            .iter()
            .map(ProviderLocator::aws)
            .chain(self.azure_key_vault_name.iter().map(ProviderLocator::azure))
            .collect()
    }

    pub fn limits(&self) -> LimitRequest {
        LimitRequest::from_flags(self.ulimit_soft, self.ulimit_hard)
    }
}

/// Execute the parsed command line.
///
/// Prints usage when no command is given. Otherwise only returns if the
/// launch failed.
pub fn execute(cli: Cli) -> Result<()> {
    if cli.command.is_empty() {
        Cli::command()
            .print_help()
            .map_err(|e| crate::error::Error::Config(format!("failed to print help: {}", e)))?;
        return Ok(());
    }

    let request = LaunchRequest::new(cli.locators(), cli.limits(), cli.command.clone())?;
    match run::execute(&request)? {}
}
