//! Error types for dbx-runner.
//!
//! Defines the error taxonomy shared by the credential provider, the compute
//! client, the execution strategies and the fallback orchestrator.

use thiserror::Error;

use crate::orchestrator::AttemptRecord;

/// Main error type for dbx-runner operations.
#[derive(Error, Debug, Clone)]
pub enum RunnerError {
    /// The identity authority rejected the client credentials.
    #[error("Authentication failed: {code}: {description}")]
    Auth { code: String, description: String },

    /// A network call could not complete (DNS, connect, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// The compute service rejected a submit request.
    #[error("Submit failed (HTTP {status}): {body}")]
    Submit { status: u16, body: String },

    /// The compute service rejected a status request.
    #[error("Poll failed (HTTP {status}): {body}")]
    Poll { status: u16, body: String },

    /// Tearing down a server-side resource failed. Never escapes a strategy attempt.
    #[error("Cleanup failed (HTTP {status}): {body}")]
    Cleanup { status: u16, body: String },

    /// A response was missing the fields needed to build a result.
    #[error("Malformed result: {0}")]
    MalformedResult(String),

    /// The strategy cannot run against the configured target.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The target resource is not in a runnable state.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Every strategy was tried and none succeeded.
    #[error("All strategies exhausted after {} attempt(s)", attempts.len())]
    Exhausted { attempts: Vec<AttemptRecord> },

    /// The run was cancelled before it completed.
    #[error("Run cancelled")]
    Cancelled,

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunnerError {
    /// Creates an authentication error from an OAuth-style error code and description.
    pub fn auth(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Auth {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Creates a network error with the given message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a malformed-result error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResult(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for errors that abort the whole run instead of a single attempt.
    ///
    /// Anything else raised inside a strategy attempt is recorded as a failed attempt
    /// and the next strategy runs.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::Cancelled | Self::Config(_) | Self::Exhausted { .. }
        )
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "Authentication Error",
            Self::Network(_) => "Network Error",
            Self::Submit { .. } => "Submit Error",
            Self::Poll { .. } => "Poll Error",
            Self::Cleanup { .. } => "Cleanup Error",
            Self::MalformedResult(_) => "Result Error",
            Self::Unsupported(_) => "Unsupported",
            Self::Precondition(_) => "Precondition Error",
            Self::Exhausted { .. } => "Execution Error",
            Self::Cancelled => "Cancelled",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<reqwest::Error> for RunnerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::network(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::network(format!("failed to connect: {e}"))
        } else {
            Self::network(e.to_string())
        }
    }
}

/// Result type alias using RunnerError.
pub type Result<T> = std::result::Result<T, RunnerError>;
