//! Logging setup.
//!
//! Logs go to stderr so the launched program owns stdout. `LAUNCHER_LOG`, when
//! set, replaces `--log-level` with a full `EnvFilter` directive.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::core::constants::LOG_ENV;
use crate::error::{Error, Result};

/// Output format.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    /// JSON lines with timestamps
    Prod,
    /// Human readable
    Dev,
}

/// Build the filter for `level`, unless `LAUNCHER_LOG` overrides it.
pub fn filter(level: &str) -> Result<EnvFilter> {
    if let Ok(directive) = std::env::var(LOG_ENV) {
        return EnvFilter::try_new(&directive)
            .map_err(|e| Error::Config(format!("invalid {} '{}': {}", LOG_ENV, directive, e)));
    }

    let level = Level::from_str(level.trim())
        .map_err(|e| Error::Config(format!("invalid log-level '{}': {}", level, e)))?;
    Ok(EnvFilter::new(format!(
        "launcher={}",
        level.as_str().to_ascii_lowercase()
    )))
}

/// Install the global subscriber.
pub fn init(level: &str, mode: LogMode) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(level)?);

    let installed = match mode {
        LogMode::Prod => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogMode::Dev => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| Error::Config(format!("failed to configure the logging: {}", e)))
}
