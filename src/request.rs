//! What to run and where to run it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The compute resource a run targets. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Target {
    /// A SQL warehouse, addressed by warehouse id.
    Warehouse(String),
    /// An all-purpose cluster, addressed by cluster id.
    Cluster(String),
}

impl Target {
    /// Returns the cluster id if this is a cluster target.
    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            Self::Cluster(id) => Some(id),
            Self::Warehouse(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warehouse(id) => write!(f, "warehouse {id}"),
            Self::Cluster(id) => write!(f, "cluster {id}"),
        }
    }
}

/// A single statement to execute against a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub statement: String,
    pub target: Target,
    /// How long the service may block a submit call before answering asynchronously.
    pub wait_hint: Duration,
}

impl ExecutionRequest {
    pub fn new(statement: impl Into<String>, target: Target) -> Self {
        Self {
            statement: statement.into(),
            target,
            wait_hint: Duration::from_secs(10),
        }
    }

    pub fn with_wait_hint(mut self, wait_hint: Duration) -> Self {
        self.wait_hint = wait_hint;
        self
    }

    /// Formats the wait hint the way the statements endpoint expects it (`"10s"`).
    ///
    /// The service accepts 0 or 5 to 50 seconds; other values are clamped.
    pub fn wait_timeout(&self) -> String {
        let secs = match self.wait_hint.as_secs() {
            0 => 0,
            s => s.clamp(5, 50),
        };
        format!("{secs}s")
    }
}
