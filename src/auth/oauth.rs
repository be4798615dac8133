//! OAuth 2.0 client-credentials flow against an Azure AD style token endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{Credential, TokenProvider};
use crate::error::{Result, RunnerError};

/// Default timeout for token requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Scope granting access to the Azure Databricks resource.
pub const DEFAULT_SCOPE: &str = "2ff814a6-3304-4ab8-85cb-cd0e6f879c1d/.default";

/// Client-credentials configuration.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Full token endpoint URL.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OAuthConfig {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: DEFAULT_SCOPE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Builds the Azure AD v2 token endpoint for a tenant.
    pub fn azure_token_url(tenant_id: &str) -> String {
        format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token")
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Token provider backed by a real identity authority.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RunnerError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Maps a rejected token request to an auth error.
    ///
    /// OAuth error bodies carry `error` and `error_description`; anything else is
    /// reported with the HTTP status as the code.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> RunnerError {
        match serde_json::from_str::<OAuthErrorResponse>(body) {
            Ok(err) => RunnerError::auth(err.error, err.error_description.unwrap_or_default()),
            Err(_) => RunnerError::auth(format!("http_{}", status.as_u16()), body.trim()),
        }
    }
}

#[async_trait]
impl TokenProvider for OAuthClient {
    async fn obtain_token(&self) -> Result<Credential> {
        debug!("Requesting token from {}", self.config.token_url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.config.scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let credential: Credential = serde_json::from_str(&body).map_err(|e| {
            RunnerError::auth("invalid_response", format!("Failed to parse token response: {e}"))
        })?;

        info!(
            "Token obtained (type {}, expires in {}s)",
            credential.token_type, credential.expires_in
        );
        Ok(credential)
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Returns an operator hint for well-known OAuth error codes.
pub fn hint_for(code: &str) -> Option<&'static str> {
    match code {
        "invalid_client" => Some(
            "Client ID or secret is incorrect or expired, or the service principal does not exist in this tenant",
        ),
        "invalid_scope" => Some("The scope may be incorrect for this Databricks instance"),
        "unauthorized_client" => {
            Some("The service principal may not have the required permissions")
        }
        _ => None,
    }
}
