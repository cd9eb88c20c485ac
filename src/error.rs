//! Error types for launcher.
//!
//! Every failure aborts the launch. Errors are grouped by the stage that
//! produced them so `main` can attach a hint.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::types::ProviderKind;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Limit(#[from] LimitError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Bad flag values or logging setup.
    #[error("config error: {0}")]
    Config(String),
}

/// Secret provider failures.
///
/// Each variant names the provider kind and the locator it was resolving.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: invalid locator '{locator}': {reason}")]
    InvalidLocator {
        provider: ProviderKind,
        locator: String,
        reason: String,
    },

    #[error("{provider}: authentication failed for '{locator}': {reason}")]
    Auth {
        provider: ProviderKind,
        locator: String,
        reason: String,
    },

    #[error("{provider}: request for '{locator}' failed: {reason}")]
    Request {
        provider: ProviderKind,
        locator: String,
        reason: String,
    },

    #[error("{provider}: request for '{locator}' timed out after {}s", .after.as_secs())]
    Timeout {
        provider: ProviderKind,
        locator: String,
        after: Duration,
    },

    #[error("{provider}: request for '{locator}' was cancelled")]
    Cancelled {
        provider: ProviderKind,
        locator: String,
    },

    #[error("{provider}: no secret or secret is empty: {locator}")]
    Empty {
        provider: ProviderKind,
        locator: String,
    },

    #[error("{provider}: failed to decode secret '{locator}': {reason}: {payload}")]
    Decode {
        provider: ProviderKind,
        locator: String,
        reason: String,
        payload: String,
    },

    #[error("{provider}: listed secret in '{locator}' has no usable id: {id}")]
    MissingId {
        provider: ProviderKind,
        locator: String,
        id: String,
    },

    #[error("{provider}: got no value for secret {locator}/{name}")]
    MissingValue {
        provider: ProviderKind,
        locator: String,
        name: String,
    },

    #[error("{provider}: secret '{key}' from '{locator}' is unusable: {reason}")]
    InvalidKey {
        provider: ProviderKind,
        locator: String,
        key: String,
        reason: String,
    },

    #[error("{provider} support not compiled. Rebuild with: cargo install launcher --features {provider}")]
    NotCompiled { provider: ProviderKind },
}

impl ProviderError {
    /// Provider kind the error came from.
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::InvalidLocator { provider, .. }
            | Self::Auth { provider, .. }
            | Self::Request { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Cancelled { provider, .. }
            | Self::Empty { provider, .. }
            | Self::Decode { provider, .. }
            | Self::MissingId { provider, .. }
            | Self::MissingValue { provider, .. }
            | Self::InvalidKey { provider, .. }
            | Self::NotCompiled { provider } => *provider,
        }
    }
}

/// Open-file limit failures.
#[derive(Error, Debug)]
pub enum LimitError {
    #[error("failed to read the open-files limit: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to set the open-files limit (soft={soft}, hard={hard}): {source}")]
    Apply {
        soft: u64,
        hard: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("soft open-files limit {soft} exceeds hard limit {hard}")]
    SoftExceedsHard { soft: u64, hard: u64 },
}

/// Executable resolution and process replacement failures.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("no command specified")]
    EmptyCommand,

    #[error("executable not found: {0}")]
    NotFound(String),

    #[error("failed to execute {}: {source}", .target.display())]
    Exec {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("process replacement is not supported on this platform")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, Error>;
