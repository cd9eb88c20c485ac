//! Secret providers.
//!
//! A provider turns a backend-specific identifier into a flat map of
//! environment-variable names to values.
//!
//! ## Backends
//!
//! - **AWS Secrets Manager**: Feature-gated (`aws`). One point lookup per ARN.
//! - **Azure Key Vault**: Feature-gated (`azure`). Enumerates and fetches every
//!   secret in the vault.
//!
//! ## Adding a New Backend
//!
//! 1. Add a [`ProviderKind`] variant
//! 2. Implement [`SecretProvider`] in a new file
//! 3. Feature-gate if appropriate
//! 4. Dispatch to it from [`Backends`]

use std::future::Future;

use crate::core::constants::{PROVIDER_TIMEOUT, TEST_LOCATOR};
use crate::core::types::{ProviderKind, ProviderLocator, SecretMap};
use crate::error::{ProviderError, Result};

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(feature = "azure")]
pub mod azure;

/// Secret backend trait.
pub trait SecretProvider {
    /// Backend kind served by this provider.
    fn kind(&self) -> ProviderKind;

    /// Fetch every secret addressed by `identifier`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on malformed identifiers, credential or
    /// network failures, empty payloads and undecodable payloads.
    fn resolve(&self, identifier: &str) -> Result<SecretMap>;
}

/// Anything that can resolve a tagged locator.
///
/// Implemented by [`Backends`] for production and by fakes in tests.
pub trait SecretSource {
    fn resolve(&self, locator: &ProviderLocator) -> Result<SecretMap>;
}

/// Fixed secrets served for [`TEST_LOCATOR`].
pub fn test_secrets() -> SecretMap {
    SecretMap::from([
        ("_ANSWER".to_string(), "42".to_string()),
        (
            "_QUESTION".to_string(),
            "The Ultimate Question of Life, the Universe, and Everything".to_string(),
        ),
    ])
}

/// `Some(test_secrets())` if `identifier` is the reserved test locator.
pub fn fixture_for(identifier: &str) -> Option<SecretMap> {
    (identifier == TEST_LOCATOR).then(test_secrets)
}

/// Closed set of compiled-in backends, dispatched by locator kind.
#[derive(Debug, Default)]
pub struct Backends {
    #[cfg(feature = "aws")]
    aws: aws::AwsSecretsManager,
    #[cfg(feature = "azure")]
    azure: azure::AzureKeyVault,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretSource for Backends {
    fn resolve(&self, locator: &ProviderLocator) -> Result<SecretMap> {
        if let Some(secrets) = fixture_for(locator.identifier()) {
            return Ok(secrets);
        }

        match locator.kind() {
            #[cfg(feature = "aws")]
            ProviderKind::Aws => self.aws.resolve(locator.identifier()),

            #[cfg(feature = "azure")]
            ProviderKind::Azure => self.azure.resolve(locator.identifier()),

            #[allow(unreachable_patterns)]
            provider => Err(ProviderError::NotCompiled { provider }.into()),
        }
    }
}

/// Drive an async fetch to completion on a private current-thread runtime.
///
/// The fetch is bounded by [`PROVIDER_TIMEOUT`] and abandoned on Ctrl-C.
#[allow(dead_code)]
pub(crate) fn block_on<T, F>(provider: ProviderKind, locator: &str, fetch: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ProviderError::Request {
            provider,
            locator: locator.to_string(),
            reason: format!("failed to create runtime: {}", e),
        })?;

    rt.block_on(async {
        tokio::select! {
            outcome = tokio::time::timeout(PROVIDER_TIMEOUT, fetch) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider,
                    locator: locator.to_string(),
                    after: PROVIDER_TIMEOUT,
                }
                .into()),
            },
            _ = tokio::signal::ctrl_c() => Err(ProviderError::Cancelled {
                provider,
                locator: locator.to_string(),
            }
            .into()),
        }
    })
}
