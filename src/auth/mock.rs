//! Token providers for testing and dry runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Credential, TokenProvider};
use crate::error::{Result, RunnerError};

/// Hands out the same credential on every call and counts calls.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: String,
    calls: AtomicUsize,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times a token was requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn obtain_token(&self) -> Result<Credential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Credential::new(self.token.clone(), 3600))
    }
}

/// Always rejects, the way an identity authority rejects bad client credentials.
#[derive(Debug, Clone)]
pub struct FailingTokenProvider {
    code: String,
    description: String,
    network: bool,
}

impl FailingTokenProvider {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            network: false,
        }
    }

    pub fn invalid_client() -> Self {
        Self::new(
            "invalid_client",
            "AADSTS7000215: Invalid client secret provided.",
        )
    }

    /// Fails as if the identity authority were unreachable.
    pub fn unreachable() -> Self {
        Self {
            network: true,
            ..Self::new("", "")
        }
    }
}

#[async_trait]
impl TokenProvider for FailingTokenProvider {
    async fn obtain_token(&self) -> Result<Credential> {
        if self.network {
            return Err(RunnerError::network("failed to connect: dns error"));
        }
        Err(RunnerError::auth(&self.code, &self.description))
    }
}
