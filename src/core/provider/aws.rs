//! AWS Secrets Manager provider.
//!
//! Fetches one secret per ARN and decodes its string payload as a flat JSON
//! object of environment variables. Enable with `--features aws`.
//!
//! Credentials come from the default AWS provider chain. The region is read
//! from the environment (`AWS_REGION`, `AWS_DEFAULT_REGION`) and the profile
//! files only, so a malformed ARN fails before any network call. When neither
//! names a region it is taken from the ARN itself:
//!
//! ```text
//! 0   1   2              3         4          5      6
//! arn:aws:secretsmanager:${REGION}:${ACCOUNT}:secret:${NAME}
//! ```

use aws_config::environment::EnvironmentVariableRegionProvider;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileRegionProvider;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use tracing::trace;
use zeroize::Zeroizing;

use super::{block_on, fixture_for, SecretProvider};
use crate::core::constants::{AWS_ARN_REGION_INDEX, AWS_ARN_SEGMENTS, AWS_VERSION_STAGE};
use crate::core::types::{ProviderKind, SecretMap};
use crate::error::{ProviderError, Result};

/// Service error codes that mean the caller could not be authenticated or
/// is not allowed to read the secret.
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDeniedException",
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "ExpiredTokenException",
    "InvalidClientTokenId",
];

/// AWS Secrets Manager backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsSecretsManager;

impl AwsSecretsManager {
    pub fn new() -> Self {
        Self
    }

    /// Fetch and decode a secret.
    ///
    /// Must run inside a tokio runtime; [`SecretProvider::resolve`] provides one.
    pub async fn fetch(&self, arn: &str) -> Result<SecretMap> {
        let region = resolve_region(local_region().await, arn)?;
        trace!(arn, region = %region, "fetching AWS secret");

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        if sdk_config.credentials_provider().is_none() {
            return Err(ProviderError::Auth {
                provider: ProviderKind::Aws,
                locator: arn.to_string(),
                reason: "no credentials provider configured".to_string(),
            }
            .into());
        }

        let client = aws_sdk_secretsmanager::Client::new(&sdk_config);

        let output = client
            .get_secret_value()
            .secret_id(arn)
            .version_stage(AWS_VERSION_STAGE)
            .send()
            .await
            .map_err(|e| classify(arn, e))?;

        let payload = match output.secret_string() {
            Some(s) if !s.is_empty() => Zeroizing::new(s.to_string()),
            _ => {
                return Err(ProviderError::Empty {
                    provider: ProviderKind::Aws,
                    locator: arn.to_string(),
                }
                .into())
            }
        };

        decode_payload(arn, &payload)
    }
}

impl SecretProvider for AwsSecretsManager {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    fn resolve(&self, arn: &str) -> Result<SecretMap> {
        if let Some(secrets) = fixture_for(arn) {
            return Ok(secrets);
        }
        block_on(self.kind(), arn, self.fetch(arn))
    }
}

/// Region configured locally, from the environment or the profile files.
///
/// Instance metadata is not consulted.
async fn local_region() -> Option<String> {
    RegionProviderChain::first_try(EnvironmentVariableRegionProvider::new())
        .or_else(ProfileFileRegionProvider::new())
        .region()
        .await
        .map(|r| r.as_ref().to_string())
}

/// Pick the region for a lookup.
///
/// An ambient region always wins. Without one, the ARN must have exactly
/// [`AWS_ARN_SEGMENTS`] segments and its region segment is used.
pub fn resolve_region(ambient: Option<String>, arn: &str) -> Result<String> {
    if let Some(region) = ambient.filter(|r| !r.is_empty()) {
        return Ok(region);
    }
    region_from_arn(arn)
}

/// Extract the region segment from a fully qualified secret ARN.
pub fn region_from_arn(arn: &str) -> Result<String> {
    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() != AWS_ARN_SEGMENTS {
        return Err(ProviderError::InvalidLocator {
            provider: ProviderKind::Aws,
            locator: arn.to_string(),
            reason: format!(
                "secret's ARN seems to be corrupt: expected {} ':'-separated segments, got {}",
                AWS_ARN_SEGMENTS,
                parts.len()
            ),
        }
        .into());
    }

    let region = parts[AWS_ARN_REGION_INDEX];
    if region.is_empty() {
        return Err(ProviderError::InvalidLocator {
            provider: ProviderKind::Aws,
            locator: arn.to_string(),
            reason: "secret's ARN has an empty region".to_string(),
        }
        .into());
    }
    Ok(region.to_string())
}

/// Decode a secret payload into a flat string map.
///
/// Anything other than a JSON object of string values is rejected, and the
/// error carries the payload.
pub fn decode_payload(arn: &str, payload: &str) -> Result<SecretMap> {
    serde_json::from_str::<SecretMap>(payload).map_err(|e| {
        ProviderError::Decode {
            provider: ProviderKind::Aws,
            locator: arn.to_string(),
            reason: e.to_string(),
            payload: payload.to_string(),
        }
        .into()
    })
}

fn classify(arn: &str, err: SdkError<GetSecretValueError>) -> crate::error::Error {
    let locator = arn.to_string();
    let provider = ProviderKind::Aws;

    if let Some(service_err) = err.as_service_error() {
        if service_err.is_resource_not_found_exception() {
            return ProviderError::Empty { provider, locator }.into();
        }
        if service_err
            .code()
            .is_some_and(|code| AUTH_ERROR_CODES.contains(&code))
        {
            return ProviderError::Auth {
                provider,
                locator,
                reason: DisplayErrorContext(&err).to_string(),
            }
            .into();
        }
    }

    ProviderError::Request {
        provider,
        locator,
        reason: DisplayErrorContext(&err).to_string(),
    }
    .into()
}
