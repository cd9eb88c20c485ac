//! Constants used throughout launcher.
//!
//! Centralizes magic strings and configuration values.

use std::time::Duration;

/// Upper bound for a single provider invocation, credential lookup included.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Locator that resolves to [`test_secrets`](crate::core::provider::test_secrets)
/// for every provider kind, without touching the network.
pub const TEST_LOCATOR: &str = "test";

/// Secrets Manager version stage requested for every lookup.
pub const AWS_VERSION_STAGE: &str = "AWSCURRENT";

/// Number of `:`-separated segments in a fully qualified secret ARN.
///
/// `arn:aws:secretsmanager:${REGION}:${ACCOUNT}:secret:${NAME}`
pub const AWS_ARN_SEGMENTS: usize = 7;

/// Index of the region segment in a secret ARN.
pub const AWS_ARN_REGION_INDEX: usize = 3;

/// Key Vault REST API version.
pub const AZURE_API_VERSION: &str = "7.4";

/// Key Vault DNS suffix; the vault endpoint is `https://<name>.<suffix>`.
pub const AZURE_VAULT_SUFFIX: &str = "vault.azure.net";

/// Token audience for Key Vault.
pub const AZURE_VAULT_RESOURCE: &str = "https://vault.azure.net";

/// Default Microsoft Entra authority.
pub const AZURE_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Environment variable that overrides `--log-level` with a full filter.
pub const LOG_ENV: &str = "LAUNCHER_LOG";

/// Instance metadata service host used for managed identity.
///
/// Overridden by `AZURE_POD_IDENTITY_AUTHORITY_HOST`.
pub const AZURE_IMDS_HOST: &str = "http://169.254.169.254";

/// Managed identity token path on the metadata service.
pub const AZURE_IMDS_TOKEN_PATH: &str = "/metadata/identity/oauth2/token";

/// Metadata service API version for token requests.
pub const AZURE_IMDS_API_VERSION: &str = "2018-02-01";

/// How long to wait for the metadata service before moving on to the `az` CLI.
pub const AZURE_IMDS_TIMEOUT: Duration = Duration::from_secs(1);

/// App Service managed identity API version (`IDENTITY_ENDPOINT`).
pub const AZURE_APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// OAuth2 client assertion type for workload identity federation.
pub const AZURE_JWT_BEARER: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
