//! Execution strategies.
//!
//! Each strategy is one way of getting a statement executed on the compute service:
//! the statement API, a command inside an execution context, or a one-shot job run.
//! They share a submit, poll, cleanup and extract lifecycle so the orchestrator can
//! drive any of them the same way.

mod command;
mod job;
mod statement;

pub use command::CommandStrategy;
pub use job::JobStrategy;
pub use statement::StatementStrategy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::auth::Credential;
use crate::error::{Result, RunnerError};
use crate::poll::{PollOutcome, PollPolicy};
use crate::remote::ComputeApi;
use crate::request::ExecutionRequest;
use crate::result::TabularResult;

/// Correlation ids needed to poll and tear down one in-flight execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionHandle {
    Statement {
        statement_id: String,
    },
    Command {
        cluster_id: String,
        context_id: String,
        command_id: String,
    },
    JobRun {
        run_id: i64,
    },
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statement { statement_id } => write!(f, "statement {statement_id}"),
            Self::Command {
                context_id,
                command_id,
                ..
            } => write!(f, "command {command_id} in context {context_id}"),
            Self::JobRun { run_id } => write!(f, "run {run_id}"),
        }
    }
}

/// Trait implemented by every execution mechanism.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Poll budget for this mechanism.
    fn policy(&self) -> PollPolicy;

    /// Starts the execution and returns the handle to poll.
    ///
    /// Returns `Cancelled` if `cancel` fires first. A strategy that creates more than
    /// one server-side resource must release what it already holds before returning.
    async fn submit(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionHandle>;

    /// Checks the execution once. A terminal success carries the raw result payload.
    async fn poll(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        handle: &ExecutionHandle,
    ) -> Result<PollOutcome<serde_json::Value>>;

    /// Releases server-side resources held by the handle.
    async fn cleanup(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        handle: &ExecutionHandle,
    ) -> Result<()>;

    /// Turns a success payload into rows. Missing or mistyped fields are a
    /// `MalformedResult`.
    fn extract(&self, payload: &serde_json::Value) -> Result<TabularResult>;
}

/// The closed set of execution mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Statement execution API (`/api/2.0/sql/statements`).
    Statement,
    /// Command execution API 1.2 (execution context + command).
    Command,
    /// Jobs API one-shot run with a SQL task.
    Job,
}

impl StrategyKind {
    /// Default fallback order.
    pub const ALL: [StrategyKind; 3] = [Self::Statement, Self::Command, Self::Job];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::Command => "command",
            Self::Job => "job",
        }
    }

    /// Default poll budget for the mechanism.
    pub fn default_policy(&self) -> PollPolicy {
        match self {
            Self::Statement | Self::Command => PollPolicy::new(30, Duration::from_secs(1)),
            Self::Job => PollPolicy::new(60, Duration::from_secs(1)),
        }
    }

    /// Creates the strategy for this kind with the given poll budget.
    pub fn build(&self, policy: PollPolicy) -> Box<dyn ExecutionStrategy> {
        match self {
            Self::Statement => Box::new(StatementStrategy::new(policy)),
            Self::Command => Box::new(CommandStrategy::new(policy)),
            Self::Job => Box::new(JobStrategy::new(policy)),
        }
    }

    /// Parses a comma-separated list such as `statement,command`.
    pub fn parse_list(s: &str) -> std::result::Result<Vec<Self>, String> {
        let kinds = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<std::result::Result<Vec<Self>, String>>()?;
        if kinds.is_empty() {
            return Err("at least one strategy is required".to_string());
        }
        Ok(kinds)
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "statement" | "statements" | "sql" => Ok(Self::Statement),
            "command" | "commands" | "context" => Ok(Self::Command),
            "job" | "jobs" | "run" => Ok(Self::Job),
            _ => Err(format!(
                "Unknown strategy: {s}. Expected: statement, command, or job"
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for a handle that belongs to a different strategy.
fn foreign_handle(kind: StrategyKind, handle: &ExecutionHandle) -> RunnerError {
    RunnerError::internal(format!("{kind} strategy cannot use {handle}"))
}

/// Looks up a nested field by path, e.g. `["result", "data_array"]`.
fn lookup<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .filter(|v| !v.is_null())
}

/// Reads column names from an array of `{ "name": ... }` objects.
fn column_names(schema: Option<&serde_json::Value>) -> Option<Vec<String>> {
    let names: Vec<String> = schema?
        .as_array()?
        .iter()
        .filter_map(|col| col.get("name")?.as_str().map(String::from))
        .collect();
    (!names.is_empty()).then_some(names)
}
