//! Credential acquisition.
//!
//! Exchanges service-principal client credentials for a short-lived bearer token.
//! A run acquires exactly one credential; there is no refresh.

mod mock;
mod oauth;

pub use mock::{FailingTokenProvider, StaticTokenProvider};
pub use oauth::{hint_for, OAuthClient, OAuthConfig, DEFAULT_SCOPE};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use std::fmt;

use crate::error::Result;

/// Trait for anything that can hand out a bearer token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtains a fresh credential. No retry happens at this layer.
    async fn obtain_token(&self) -> Result<Credential>;
}

/// A bearer token as issued by the identity authority.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    #[serde(rename = "access_token")]
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            token: token.into(),
            token_type: default_token_type(),
            expires_in,
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Decodes the JWT payload, if the token is a JWT.
    ///
    /// The signature is not verified; this is for display only.
    pub fn claims(&self) -> Option<TokenClaims> {
        let mut parts = self.token.split('.');
        let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

// Keep the token out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// The subset of Azure AD access-token claims worth showing to an operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    pub appid: Option<String>,
    pub aud: Option<String>,
    pub tid: Option<String>,
    pub exp: Option<i64>,
}
