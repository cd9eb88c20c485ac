//! Launcher - prepares the environment for a sub-process and becomes it.

use clap::Parser;

use launcher::cli::output;
use launcher::cli::{execute, logging, Cli};
use launcher::error::{Error, LaunchError, LimitError, ProviderError};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&cli.log_level, cli.log_mode) {
        output::error(&e.to_string());
        std::process::exit(1);
    }

    if let Err(e) = execute(cli) {
        match &e {
            Error::Provider(p) => {
                tracing::error!(provider = %p.provider(), error = %e, "launch failed")
            }
            _ => tracing::error!(error = %e, "launch failed"),
        }

        output::error(&format!("Failed with error: {}", e));
        if let Some(hint) = hint_for(&e) {
            output::hint(&hint);
        }
        std::process::exit(1);
    }
}

fn hint_for(e: &Error) -> Option<String> {
    match e {
        Error::Provider(ProviderError::Auth { provider, .. }) => Some(format!(
            "check the {} credentials available to this process",
            provider
        )),
        Error::Provider(ProviderError::InvalidLocator { .. }) => {
            Some("use a full secret ARN or set AWS_REGION".to_string())
        }
        Error::Launch(LaunchError::NotFound(_)) => {
            Some("check the command name and PATH".to_string())
        }
        Error::Limit(LimitError::SoftExceedsHard { .. }) => {
            Some("raise --ulimit-hard or lower --ulimit-soft".to_string())
        }
        _ => None,
    }
}
