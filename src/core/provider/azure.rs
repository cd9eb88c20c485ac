//! Azure Key Vault provider.
//!
//! Reads every secret in a vault through the Key Vault REST API.
//! Enable with `--features azure`.
//!
//! ## Credentials
//!
//! Tried in order, the first one configured wins:
//!
//! 1. Service principal: `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
//!    `AZURE_CLIENT_SECRET` (client-credentials flow against
//!    `AZURE_AUTHORITY_HOST`, default `https://login.microsoftonline.com`)
//! 2. Workload identity: `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
//!    `AZURE_FEDERATED_TOKEN_FILE` (client assertion, as on AKS)
//! 3. App Service managed identity: `IDENTITY_ENDPOINT` and `IDENTITY_HEADER`
//! 4. VM managed identity through the instance metadata service, skipped when
//!    it does not answer within a second (`AZURE_CLIENT_ID` selects a
//!    user-assigned identity)
//! 5. The `az` CLI: `az account get-access-token --resource https://vault.azure.net`
//!
//! Secret names may contain `-`, which is replaced with `_` in the output.

use std::collections::BTreeMap;
use std::fmt;
use std::process::Stdio;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::trace;
use zeroize::Zeroizing;

use super::{block_on, fixture_for, SecretProvider};
use crate::core::constants::{
    AZURE_API_VERSION, AZURE_APP_SERVICE_API_VERSION, AZURE_AUTHORITY_HOST, AZURE_IMDS_API_VERSION,
    AZURE_IMDS_HOST, AZURE_IMDS_TIMEOUT, AZURE_IMDS_TOKEN_PATH, AZURE_JWT_BEARER,
    AZURE_VAULT_RESOURCE, AZURE_VAULT_SUFFIX, PROVIDER_TIMEOUT,
};
use crate::core::types::{ProviderKind, SecretMap};
use crate::error::{ProviderError, Result};

/// Variables read by the credential chain.
const CREDENTIAL_VARS: &[&str] = &[
    "AZURE_TENANT_ID",
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "AZURE_AUTHORITY_HOST",
    "AZURE_FEDERATED_TOKEN_FILE",
    "IDENTITY_ENDPOINT",
    "IDENTITY_HEADER",
    "AZURE_POD_IDENTITY_AUTHORITY_HOST",
    "PATH",
];

/// Settings for the credential chain, keyed by environment variable name.
#[derive(Clone, Default)]
pub struct CredentialEnv {
    vars: BTreeMap<String, Zeroizing<String>>,
}

impl CredentialEnv {
    /// Snapshot of the chain's variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(
            CREDENTIAL_VARS
                .iter()
                .filter_map(|name| std::env::var(name).ok().map(|value| (*name, value))),
        )
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), Zeroizing::new(v.into())))
                .collect(),
        }
    }

    /// Non-empty value of `name`.
    fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    fn authority(&self) -> &str {
        self.var("AZURE_AUTHORITY_HOST")
            .unwrap_or(AZURE_AUTHORITY_HOST)
            .trim_end_matches('/')
    }
}

impl fmt::Debug for CredentialEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEnv")
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// How a bearer token for Key Vault is obtained.
#[derive(Clone, Default)]
pub enum Credential {
    /// Credential chain configured from the process environment.
    #[default]
    Default,
    /// Credential chain configured from explicit settings.
    Chain(CredentialEnv),
    /// A pre-acquired bearer token.
    Token(Zeroizing<String>),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Chain(env) => f.debug_tuple("Chain").field(env).finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

/// Azure Key Vault backend.
#[derive(Debug, Clone, Default)]
pub struct AzureKeyVault {
    /// Overrides `https://<vault>.vault.azure.net`.
    endpoint: Option<String>,
    credential: Credential,
}

#[derive(Debug, Deserialize)]
struct SecretListPage {
    #[serde(default)]
    value: Vec<SecretItem>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SecretItem {
    id: Option<String>,
}

#[derive(Deserialize)]
struct SecretBundle {
    value: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
}

impl AzureKeyVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Talk to `endpoint` instead of the public vault host, with a fixed credential.
    pub fn with_endpoint(endpoint: impl Into<String>, credential: Credential) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            credential,
        }
    }

    /// Vault base URL, without a trailing slash.
    pub fn vault_url(&self, vault_name: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}", vault_name, AZURE_VAULT_SUFFIX),
        }
    }

    /// List every secret in the vault and fetch each current value.
    ///
    /// Must run inside a tokio runtime; [`SecretProvider::resolve`] provides one.
    pub async fn fetch(&self, vault_name: &str) -> Result<SecretMap> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| request_error(vault_name, e))?;
        let token = self.token(&client, vault_name).await?;
        let base = self.vault_url(vault_name);

        let mut secrets = SecretMap::new();
        let mut next = Some(format!("{}/secrets?api-version={}", base, AZURE_API_VERSION));

        while let Some(page_url) = next.take() {
            trace!(vault = vault_name, url = %page_url, "listing Azure secrets");
            let page: SecretListPage = get_json(&client, &page_url, &token, vault_name).await?;

            for item in page.value {
                let id = item.id.ok_or_else(|| ProviderError::MissingId {
                    provider: ProviderKind::Azure,
                    locator: vault_name.to_string(),
                    id: "<none>".to_string(),
                })?;
                let name = secret_name(&id).ok_or_else(|| ProviderError::MissingId {
                    provider: ProviderKind::Azure,
                    locator: vault_name.to_string(),
                    id: id.clone(),
                })?;

                let url = format!("{}/secrets/{}?api-version={}", base, name, AZURE_API_VERSION);
                let bundle: SecretBundle = get_json(&client, &url, &token, vault_name).await?;
                let value = bundle.value.ok_or_else(|| ProviderError::MissingValue {
                    provider: ProviderKind::Azure,
                    locator: vault_name.to_string(),
                    name: name.clone(),
                })?;

                secrets.insert(env_key(&name), value);
            }

            next = page.next_link.filter(|link| !link.is_empty());
        }

        Ok(secrets)
    }

    async fn token(&self, client: &Client, vault_name: &str) -> Result<Zeroizing<String>> {
        match &self.credential {
            Credential::Token(token) => Ok(token.clone()),
            Credential::Default => {
                chain_token(client, &CredentialEnv::from_env(), vault_name).await
            }
            Credential::Chain(env) => chain_token(client, env, vault_name).await,
        }
    }
}

impl SecretProvider for AzureKeyVault {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn resolve(&self, vault_name: &str) -> Result<SecretMap> {
        if let Some(secrets) = fixture_for(vault_name) {
            return Ok(secrets);
        }
        block_on(self.kind(), vault_name, self.fetch(vault_name))
    }
}

/// Secret name from a Key Vault secret id
/// (`https://<vault>/secrets/<name>[/<version>]`).
pub fn secret_name(id: &str) -> Option<String> {
    let url = Url::parse(id).ok()?;
    let mut segments = url.path_segments()?;
    if segments.next()? != "secrets" {
        return None;
    }
    let name = segments.next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Environment-variable name for a secret name.
pub fn env_key(name: &str) -> String {
    name.replace('-', "_")
}

async fn chain_token(
    client: &Client,
    env: &CredentialEnv,
    vault_name: &str,
) -> Result<Zeroizing<String>> {
    if let Some(sp) = ServicePrincipal::from_env(env) {
        trace!(vault = vault_name, "using service principal credential");
        return sp.token(client, env, vault_name).await;
    }
    if let Some(wi) = WorkloadIdentity::from_env(env) {
        trace!(vault = vault_name, "using workload identity credential");
        return wi.token(client, env, vault_name).await;
    }
    if let Some(endpoint) = env.var("IDENTITY_ENDPOINT") {
        if let Some(header) = env.var("IDENTITY_HEADER") {
            trace!(vault = vault_name, "using App Service managed identity");
            return app_service_token(client, env, endpoint, header, vault_name).await;
        }
    }
    if let Some(token) = imds_token(client, env, vault_name).await? {
        return Ok(token);
    }
    trace!(vault = vault_name, "falling back to the az CLI");
    cli_token(env, vault_name).await
}

struct ServicePrincipal<'a> {
    tenant_id: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

impl<'a> ServicePrincipal<'a> {
    fn from_env(env: &'a CredentialEnv) -> Option<Self> {
        Some(Self {
            tenant_id: env.var("AZURE_TENANT_ID")?,
            client_id: env.var("AZURE_CLIENT_ID")?,
            client_secret: env.var("AZURE_CLIENT_SECRET")?,
        })
    }

    async fn token(
        &self,
        client: &Client,
        env: &CredentialEnv,
        vault_name: &str,
    ) -> Result<Zeroizing<String>> {
        let scope = format!("{}/.default", AZURE_VAULT_RESOURCE);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id),
            ("client_secret", self.client_secret),
            ("scope", scope.as_str()),
        ];
        let request = client
            .post(token_url(env, self.tenant_id))
            .form(&form);
        exchange(request, "service principal", vault_name).await
    }
}

struct WorkloadIdentity<'a> {
    tenant_id: &'a str,
    client_id: &'a str,
    token_file: &'a str,
}

impl<'a> WorkloadIdentity<'a> {
    fn from_env(env: &'a CredentialEnv) -> Option<Self> {
        Some(Self {
            tenant_id: env.var("AZURE_TENANT_ID")?,
            client_id: env.var("AZURE_CLIENT_ID")?,
            token_file: env.var("AZURE_FEDERATED_TOKEN_FILE")?,
        })
    }

    async fn token(
        &self,
        client: &Client,
        env: &CredentialEnv,
        vault_name: &str,
    ) -> Result<Zeroizing<String>> {
        let assertion = std::fs::read_to_string(self.token_file)
            .map(Zeroizing::new)
            .map_err(|e| {
                auth_error(
                    vault_name,
                    format!("failed to read federated token file {}: {}", self.token_file, e),
                )
            })?;
        let scope = format!("{}/.default", AZURE_VAULT_RESOURCE);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id),
            ("client_assertion_type", AZURE_JWT_BEARER),
            ("client_assertion", assertion.trim()),
            ("scope", scope.as_str()),
        ];
        let request = client
            .post(token_url(env, self.tenant_id))
            .form(&form);
        exchange(request, "workload identity", vault_name).await
    }
}

fn token_url(env: &CredentialEnv, tenant_id: &str) -> String {
    format!("{}/{}/oauth2/v2.0/token", env.authority(), tenant_id)
}

async fn app_service_token(
    client: &Client,
    env: &CredentialEnv,
    endpoint: &str,
    header: &str,
    vault_name: &str,
) -> Result<Zeroizing<String>> {
    let mut query = vec![
        ("api-version", AZURE_APP_SERVICE_API_VERSION),
        ("resource", AZURE_VAULT_RESOURCE),
    ];
    if let Some(client_id) = env.var("AZURE_CLIENT_ID") {
        query.push(("client_id", client_id));
    }
    let request = client
        .get(endpoint)
        .query(&query)
        .header("X-IDENTITY-HEADER", header);
    exchange(request, "managed identity", vault_name).await
}

/// Token from the instance metadata service, or `None` when no managed
/// identity is reachable there.
async fn imds_token(
    client: &Client,
    env: &CredentialEnv,
    vault_name: &str,
) -> Result<Option<Zeroizing<String>>> {
    let host = env
        .var("AZURE_POD_IDENTITY_AUTHORITY_HOST")
        .unwrap_or(AZURE_IMDS_HOST)
        .trim_end_matches('/');
    let mut query = vec![
        ("api-version", AZURE_IMDS_API_VERSION),
        ("resource", AZURE_VAULT_RESOURCE),
    ];
    if let Some(client_id) = env.var("AZURE_CLIENT_ID") {
        query.push(("client_id", client_id));
    }

    let response = match client
        .get(format!("{}{}", host, AZURE_IMDS_TOKEN_PATH))
        .query(&query)
        .header("Metadata", "true")
        .timeout(AZURE_IMDS_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            trace!(vault = vault_name, error = %e, "managed identity unavailable");
            return Ok(None);
        }
    };

    let status = response.status();
    if !status.is_success() {
        trace!(vault = vault_name, %status, "managed identity unavailable");
        return Ok(None);
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        auth_error(vault_name, format!("invalid managed identity token response: {}", e))
    })?;
    Ok(Some(Zeroizing::new(token.access_token)))
}

/// Send a token request and read `access_token` from the reply.
async fn exchange(
    request: RequestBuilder,
    source: &str,
    vault_name: &str,
) -> Result<Zeroizing<String>> {
    let response = request.send().await.map_err(|e| {
        auth_error(vault_name, format!("{} token request failed: {}", source, e))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(auth_error(
            vault_name,
            format!("{} token endpoint returned {}: {}", source, status, body),
        ));
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        auth_error(vault_name, format!("invalid {} token response: {}", source, e))
    })?;
    Ok(Zeroizing::new(token.access_token))
}

async fn cli_token(env: &CredentialEnv, vault_name: &str) -> Result<Zeroizing<String>> {
    let mut command = tokio::process::Command::new("az");
    command
        .args([
            "account",
            "get-access-token",
            "--resource",
            AZURE_VAULT_RESOURCE,
            "--output",
            "json",
        ])
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(path) = env.var("PATH") {
        command.env("PATH", path);
    }

    let output = command.output().await.map_err(|e| {
        auth_error(
            vault_name,
            format!("no Azure credential configured and az CLI unavailable: {}", e),
        )
    })?;

    if !output.status.success() {
        return Err(auth_error(
            vault_name,
            format!(
                "az account get-access-token failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let stdout = Zeroizing::new(output.stdout);
    let token: CliTokenResponse = serde_json::from_slice(&stdout)
        .map_err(|e| auth_error(vault_name, format!("invalid az CLI output: {}", e)))?;
    Ok(Zeroizing::new(token.access_token))
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    token: &str,
    vault_name: &str,
) -> Result<T> {
    let response = client
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| request_error(vault_name, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let reason = format!("GET {} returned {}: {}", strip_query(url), status, body);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => auth_error(vault_name, reason),
            _ => ProviderError::Request {
                provider: ProviderKind::Azure,
                locator: vault_name.to_string(),
                reason,
            }
            .into(),
        });
    }

    response.json().await.map_err(|e| request_error(vault_name, e))
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

fn auth_error(vault_name: &str, reason: String) -> crate::error::Error {
    ProviderError::Auth {
        provider: ProviderKind::Azure,
        locator: vault_name.to_string(),
        reason,
    }
    .into()
}

fn request_error(vault_name: &str, err: reqwest::Error) -> crate::error::Error {
    ProviderError::Request {
        provider: ProviderKind::Azure,
        locator: vault_name.to_string(),
        reason: err.to_string(),
    }
    .into()
}
