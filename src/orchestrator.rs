//! Fallback orchestration.
//!
//! Acquires one credential, checks that the target can run anything at all, then
//! tries each strategy in the caller's order until one returns rows. Failures inside
//! a strategy become attempt records; only authentication failure, cancellation and
//! exhaustion reach the caller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{Credential, OAuthClient, TokenProvider};
use crate::config::Config;
use crate::error::{Result, RunnerError};
use crate::poll::{await_completion, cancellable, Completion};
use crate::remote::{ClusterInfo, ComputeApi, WorkspaceClient};
use crate::request::{ExecutionRequest, Target};
use crate::result::TabularResult;
use crate::strategy::{ExecutionHandle, ExecutionStrategy, StrategyKind};

/// Strategy name used for the precondition record.
const PRECONDITION: &str = "precondition";

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
    TimedOut,
    PreconditionFailed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::PreconditionFailed => "precondition failed",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic record of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub strategy: String,
    pub outcome: AttemptOutcome,
    pub detail: Option<String>,
    pub elapsed: Duration,
}

impl AttemptRecord {
    fn new(
        strategy: impl Into<String>,
        outcome: AttemptOutcome,
        detail: Option<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            outcome,
            detail,
            elapsed,
        }
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} after {:.1}s",
            self.strategy,
            self.outcome,
            self.elapsed.as_secs_f64()
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// A successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The strategy that produced the rows.
    pub strategy: StrategyKind,
    pub result: TabularResult,
    /// Every attempt made, the successful one last.
    pub attempts: Vec<AttemptRecord>,
}

/// How one strategy attempt ended, before it becomes a record.
enum AttemptResult {
    Succeeded(TabularResult),
    Failed(String),
    TimedOut,
}

/// Drives the credential provider and the strategies for a run.
pub struct Orchestrator {
    tokens: Arc<dyn TokenProvider>,
    api: Arc<dyn ComputeApi>,
    check_cluster_state: bool,
}

impl Orchestrator {
    pub fn new(tokens: Arc<dyn TokenProvider>, api: Arc<dyn ComputeApi>) -> Self {
        Self {
            tokens,
            api,
            check_cluster_state: true,
        }
    }

    /// Creates an orchestrator talking to the identity authority and workspace in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let tokens = OAuthClient::new(config.oauth_config()?)?;
        let api = WorkspaceClient::new(config.workspace_host()?)?;
        Ok(Self::new(Arc::new(tokens), Arc::new(api))
            .with_cluster_check(config.run.check_cluster_state))
    }

    /// Enables or disables the cluster state check before any strategy runs.
    pub fn with_cluster_check(mut self, enabled: bool) -> Self {
        self.check_cluster_state = enabled;
        self
    }

    /// Runs `request`, trying `strategies` in order until one succeeds.
    pub async fn run(
        &self,
        request: &ExecutionRequest,
        strategies: &[Box<dyn ExecutionStrategy>],
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        if strategies.is_empty() {
            return Err(RunnerError::config("no execution strategies configured"));
        }

        let credential = cancellable(cancel, self.tokens.obtain_token()).await?;
        if let Some(claims) = credential.claims() {
            debug!("Token for app {:?} (audience {:?})", claims.appid, claims.aud);
        }

        let mut attempts = Vec::with_capacity(strategies.len());

        let start = Instant::now();
        match self.check_target(&credential, &request.target, cancel).await {
            Ok(()) => {}
            Err(RunnerError::Precondition(reason)) => {
                warn!("Target not runnable: {}", reason);
                attempts.push(AttemptRecord::new(
                    PRECONDITION,
                    AttemptOutcome::PreconditionFailed,
                    Some(reason),
                    start.elapsed(),
                ));
                return Err(RunnerError::Exhausted { attempts });
            }
            Err(e) => return Err(e),
        }

        for strategy in strategies {
            let kind = strategy.kind();
            info!("Trying {} strategy against {}", kind, request.target);

            let start = Instant::now();
            let result = self
                .try_strategy(strategy.as_ref(), &credential, request, cancel)
                .await?;
            let elapsed = start.elapsed();

            match result {
                AttemptResult::Succeeded(rows) => {
                    info!("{} strategy returned {} row(s)", kind, rows.row_count());
                    attempts.push(AttemptRecord::new(
                        kind.as_str(),
                        AttemptOutcome::Succeeded,
                        None,
                        elapsed,
                    ));
                    return Ok(RunReport {
                        strategy: kind,
                        result: rows,
                        attempts,
                    });
                }
                AttemptResult::Failed(reason) => {
                    warn!("{} strategy failed: {}", kind, reason);
                    attempts.push(AttemptRecord::new(
                        kind.as_str(),
                        AttemptOutcome::Failed,
                        Some(reason),
                        elapsed,
                    ));
                }
                AttemptResult::TimedOut => {
                    let policy = strategy.policy();
                    warn!(
                        "{} strategy still pending after {} poll(s)",
                        kind, policy.max_attempts
                    );
                    attempts.push(AttemptRecord::new(
                        kind.as_str(),
                        AttemptOutcome::TimedOut,
                        Some(format!("still pending after {} poll(s)", policy.max_attempts)),
                        elapsed,
                    ));
                }
            }
        }

        Err(RunnerError::Exhausted { attempts })
    }

    /// Lists the workspace's clusters, for picking a target when the configured one
    /// is not running.
    pub async fn list_clusters(&self, cancel: &CancellationToken) -> Result<Vec<ClusterInfo>> {
        let credential = cancellable(cancel, self.tokens.obtain_token()).await?;
        let clusters = cancellable(cancel, self.api.list_clusters(&credential)).await?;
        debug!("Workspace has {} cluster(s)", clusters.len());
        Ok(clusters)
    }

    /// Fails with `Precondition` when the target cannot run anything.
    ///
    /// Only cluster targets are checked; warehouses start on demand.
    async fn check_target(
        &self,
        credential: &Credential,
        target: &Target,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(cluster_id) = target.cluster_id().filter(|_| self.check_cluster_state) else {
            return Ok(());
        };

        let fetch = self.api.get_cluster(credential, cluster_id);
        let cluster = match cancellable(cancel, fetch).await {
            Ok(cluster) => cluster,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                return Err(RunnerError::Precondition(format!(
                    "could not read cluster {cluster_id}: {e}"
                )))
            }
        };

        info!(
            "Cluster {} ({}): {}, Spark {}, driver {}",
            cluster_id,
            cluster.cluster_name.as_deref().unwrap_or("unnamed"),
            cluster.state,
            cluster.spark_version.as_deref().unwrap_or("unknown"),
            cluster.driver_node_type_id.as_deref().unwrap_or("unknown"),
        );
        if cluster.is_running() {
            return Ok(());
        }

        let mut reason = format!("cluster {} is {}", cluster_id, cluster.state);
        if let Some(message) = cluster.state_message.filter(|m| !m.is_empty()) {
            reason.push_str(&format!(": {message}"));
        }
        Err(RunnerError::Precondition(reason))
    }

    /// Runs one strategy through submit, poll, cleanup and extract.
    ///
    /// Only fatal errors (see [`RunnerError::is_fatal`]) are returned as errors; any
    /// other failure becomes a failed attempt. Cleanup runs on every path once a
    /// handle exists, including cancellation and poll errors, before this returns.
    async fn try_strategy(
        &self,
        strategy: &dyn ExecutionStrategy,
        credential: &Credential,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<AttemptResult> {
        let api = self.api.as_ref();

        let handle = match strategy.submit(api, credential, request, cancel).await {
            Ok(handle) => handle,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(AttemptResult::Failed(e.to_string())),
        };
        let policy = strategy.policy();
        info!(
            "{} strategy submitted {}, polling up to {} time(s) over {:?}",
            strategy.kind(),
            handle,
            policy.max_attempts,
            policy.worst_case()
        );

        let handle_ref = &handle;
        let completion = await_completion(
            move || strategy.poll(api, credential, handle_ref),
            policy,
            cancel,
        )
        .await;

        self.release(strategy, credential, &handle).await;

        match completion {
            Ok(Completion::Succeeded(payload)) => Ok(match strategy.extract(&payload) {
                Ok(rows) => AttemptResult::Succeeded(rows),
                Err(e) => AttemptResult::Failed(e.to_string()),
            }),
            Ok(Completion::Failed(reason)) => Ok(AttemptResult::Failed(reason)),
            Ok(Completion::TimedOut) => Ok(AttemptResult::TimedOut),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(AttemptResult::Failed(e.to_string())),
        }
    }

    /// Best-effort teardown; failures are logged and swallowed.
    async fn release(
        &self,
        strategy: &dyn ExecutionStrategy,
        credential: &Credential,
        handle: &ExecutionHandle,
    ) {
        match strategy.cleanup(self.api.as_ref(), credential, handle).await {
            Ok(()) => debug!("Released {}", handle),
            Err(e) => warn!("Cleanup of {} failed: {}", handle, e),
        }
    }
}
