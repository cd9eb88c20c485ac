//! Domain types shared by the providers, the aggregator and the launcher.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::limits::LimitRequest;
use crate::error::{LaunchError, Result};

/// Environment-variable name to value, as returned by a provider.
///
/// Ordered so that merging and environment assembly are deterministic.
pub type SecretMap = BTreeMap<String, String>;

/// Secret backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// AWS Secrets Manager, addressed by secret ARN.
    Aws,
    /// Azure Key Vault, addressed by vault name.
    Azure,
}

impl ProviderKind {
    /// Provider display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One secret source: a backend kind plus its backend-specific identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLocator {
    kind: ProviderKind,
    identifier: String,
}

impl ProviderLocator {
    pub fn new(kind: ProviderKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }

    pub fn aws(arn: impl Into<String>) -> Self {
        Self::new(ProviderKind::Aws, arn)
    }

    pub fn azure(vault_name: impl Into<String>) -> Self {
        Self::new(ProviderKind::Azure, vault_name)
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for ProviderLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.identifier)
    }
}

/// Everything the launch pipeline needs, as collected from the command line.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    providers: Vec<ProviderLocator>,
    limits: LimitRequest,
    command: Vec<String>,
}

impl LaunchRequest {
    /// Build a request. The command vector must not be empty.
    pub fn new(
        providers: Vec<ProviderLocator>,
        limits: LimitRequest,
        command: Vec<String>,
    ) -> Result<Self> {
        if command.is_empty() {
            return Err(LaunchError::EmptyCommand.into());
        }
        Ok(Self {
            providers,
            limits,
            command,
        })
    }

    /// Secret sources, in override order.
    pub fn providers(&self) -> &[ProviderLocator] {
        &self.providers
    }

    pub fn limits(&self) -> LimitRequest {
        self.limits
    }

    /// The full argv; `command()[0]` is the target path or name.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn program(&self) -> &str {
        &self.command[0]
    }
}
