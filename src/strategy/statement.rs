//! Statement execution API strategy.
//!
//! Posts the statement bound to a warehouse (or, where the deployment allows it, a
//! cluster) and reads the row array straight from the status response. Nothing is
//! allocated server-side beyond the statement itself, so cleanup does nothing.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use serde_json::json;
use tracing::debug;

use super::{column_names, foreign_handle, lookup, ExecutionHandle, ExecutionStrategy, StrategyKind};
use crate::auth::Credential;
use crate::error::{Result, RunnerError};
use crate::poll::{cancellable, PollOutcome, PollPolicy};
use crate::remote::{is_not_found, ComputeApi, StatementRequest, NOT_FOUND_REASON};
use crate::request::{ExecutionRequest, Target};
use crate::result::TabularResult;

#[derive(Debug, Clone)]
pub struct StatementStrategy {
    policy: PollPolicy,
}

impl StatementStrategy {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    fn build_request(request: &ExecutionRequest) -> StatementRequest {
        let (warehouse_id, cluster_id) = match &request.target {
            Target::Warehouse(id) => (Some(id.clone()), None),
            Target::Cluster(id) => (None, Some(id.clone())),
        };
        StatementRequest {
            warehouse_id,
            cluster_id,
            statement: request.statement.clone(),
            wait_timeout: request.wait_timeout(),
            on_wait_timeout: "CONTINUE".to_string(),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for StatementStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Statement
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
        let statement = Self::build_request(request);
        let response = cancellable(cancel, api.create_statement(credential, &statement)).await?;
        Ok(ExecutionHandle::Statement {
            statement_id: response.statement_id,
        })
    }

    async fn poll(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        handle: &ExecutionHandle,
    ) -> Result<PollOutcome<serde_json::Value>> {
        let ExecutionHandle::Statement { statement_id } = handle else {
            return Err(foreign_handle(self.kind(), handle));
        };

        let response = match api.get_statement(credential, statement_id).await {
            Ok(response) => response,
            Err(e) if is_not_found(&e) => return Ok(PollOutcome::Failed(NOT_FOUND_REASON.into())),
            Err(e) => return Err(e),
        };

        let Some(status) = response.status else {
            return Err(RunnerError::malformed("statement response has no status"));
        };

        Ok(match status.state.as_str() {
            "SUCCEEDED" => PollOutcome::Succeeded(json!({
                "manifest": response.manifest,
                "result": response.result,
            })),
            "FAILED" | "CANCELED" | "CLOSED" => {
                let reason = status
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| format!("statement {}", status.state));
                PollOutcome::Failed(reason)
            }
            other => {
                debug!("Statement {} is {}", statement_id, other);
                PollOutcome::Pending
            }
        })
    }

    async fn cleanup(
        &self,
        _api: &dyn ComputeApi,
        _credential: &Credential,
        _handle: &ExecutionHandle,
    ) -> Result<()> {
        Ok(())
    }

    fn extract(&self, payload: &serde_json::Value) -> Result<TabularResult> {
        let result = lookup(payload, &["result"])
            .ok_or_else(|| RunnerError::malformed("statement succeeded without a result"))?;
        let columns = column_names(lookup(payload, &["manifest", "schema", "columns"]));

        match result.get("data_array") {
            Some(data) if !data.is_null() => TabularResult::from_json_rows(columns, data),
            // Zero-row results omit data_array entirely.
            _ if result.get("row_count").and_then(|n| n.as_u64()) == Some(0) => {
                Ok(TabularResult::new(columns, Vec::new()))
            }
            _ => Err(RunnerError::malformed("statement result has no data_array")),
        }
    }
}
