//! Command execution API strategy.
//!
//! Creates a SQL execution context on the cluster and runs the statement as a
//! command inside it. The context is a server-side session, so it is destroyed
//! on every path once it exists: after a failed or cancelled command submission
//! here, and after polling (whatever its outcome) through `cleanup`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{column_names, foreign_handle, lookup, ExecutionHandle, ExecutionStrategy, StrategyKind};
use crate::auth::Credential;
use crate::error::{Result, RunnerError};
use crate::poll::{cancellable, PollOutcome, PollPolicy};
use crate::remote::{
    is_not_found, ComputeApi, CreateContextRequest, DestroyContextRequest, ExecuteCommandRequest,
    NOT_FOUND_REASON,
};
use crate::request::ExecutionRequest;
use crate::result::TabularResult;

const LANGUAGE: &str = "sql";

#[derive(Debug, Clone)]
pub struct CommandStrategy {
    policy: PollPolicy,
}

impl CommandStrategy {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    async fn destroy(
        api: &dyn ComputeApi,
        credential: &Credential,
        cluster_id: &str,
        context_id: &str,
    ) -> Result<()> {
        let request = DestroyContextRequest {
            cluster_id: cluster_id.to_string(),
            context_id: context_id.to_string(),
        };
        api.destroy_context(credential, &request).await
    }

    /// Builds a failure reason from a command's `results` object.
    fn failure_reason(results: Option<&serde_json::Value>, fallback: &str) -> String {
        results
            .and_then(|r| {
                ["cause", "summary", "data"]
                    .iter()
                    .find_map(|key| r.get(key)?.as_str())
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[async_trait]
impl ExecutionStrategy for CommandStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Command
    }

    fn policy(&self) -> PollPolicy {
        self.policy
    }

    async fn submit(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionHandle> {
        let cluster_id = request.target.cluster_id().ok_or_else(|| {
            RunnerError::Unsupported("command execution requires a cluster target".into())
        })?;

        let create = CreateContextRequest {
            cluster_id: cluster_id.to_string(),
            language: LANGUAGE.to_string(),
        };
        let context_id = cancellable(cancel, api.create_context(credential, &create)).await?;
        debug!("Execution context {} created", context_id);

        // From here on the context exists and no handle has escaped yet, so every
        // early return has to destroy it.
        let execute = ExecuteCommandRequest {
            cluster_id: cluster_id.to_string(),
            context_id: context_id.clone(),
            language: LANGUAGE.to_string(),
            command: request.statement.clone(),
        };
        match cancellable(cancel, api.execute_command(credential, &execute)).await {
            Ok(command_id) => Ok(ExecutionHandle::Command {
                cluster_id: cluster_id.to_string(),
                context_id,
                command_id,
            }),
            Err(e) => {
                if let Err(destroy_err) =
                    Self::destroy(api, credential, cluster_id, &context_id).await
                {
                    warn!("Failed to destroy context {}: {}", context_id, destroy_err);
                }
                Err(e)
            }
        }
    }

    async fn poll(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        handle: &ExecutionHandle,
    ) -> Result<PollOutcome<serde_json::Value>> {
        let ExecutionHandle::Command {
            cluster_id,
            context_id,
            command_id,
        } = handle
        else {
            return Err(foreign_handle(self.kind(), handle));
        };

        let response = match api
            .command_status(credential, cluster_id, context_id, command_id)
            .await
        {
            Ok(response) => response,
            Err(e) if is_not_found(&e) => return Ok(PollOutcome::Failed(NOT_FOUND_REASON.into())),
            Err(e) => return Err(e),
        };

        let results = response.results.as_ref();
        Ok(match response.status.as_str() {
            "Finished" => {
                let is_error = results
                    .and_then(|r| r.get("resultType"))
                    .and_then(|t| t.as_str())
                    == Some("error");
                if is_error {
                    PollOutcome::Failed(Self::failure_reason(results, "command failed"))
                } else {
                    PollOutcome::Succeeded(response.results.unwrap_or(serde_json::Value::Null))
                }
            }
            "Error" => PollOutcome::Failed(Self::failure_reason(results, "command failed")),
            "Cancelled" => PollOutcome::Failed("command cancelled".to_string()),
            _ => PollOutcome::Pending,
        })
    }

    async fn cleanup(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        handle: &ExecutionHandle,
    ) -> Result<()> {
        let ExecutionHandle::Command {
            cluster_id,
            context_id,
            ..
        } = handle
        else {
            return Err(foreign_handle(self.kind(), handle));
        };
        Self::destroy(api, credential, cluster_id, context_id).await
    }

    fn extract(&self, payload: &serde_json::Value) -> Result<TabularResult> {
        let data = lookup(payload, &["data"])
            .ok_or_else(|| RunnerError::malformed("command results have no data"))?;
        TabularResult::from_json_rows(column_names(payload.get("schema")), data)
    }
}
