//! Jobs API strategy.
//!
//! Submits a one-shot run with a single SQL task on an existing cluster. A run has
//! two state dimensions: the life cycle (`PENDING`, `RUNNING`, `TERMINATED`, ...) and
//! the result (`SUCCESS`, `FAILED`, ...). Only `TERMINATED` is terminal here; a
//! successful run's output is fetched as part of the final poll. Runs are not
//! persistent resources, so cleanup does nothing.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{foreign_handle, lookup, ExecutionHandle, ExecutionStrategy, StrategyKind};
use crate::auth::Credential;
use crate::error::{Result, RunnerError};
use crate::poll::{cancellable, PollOutcome, PollPolicy};
use crate::remote::types::{SqlTask, SqlTaskQuery, SubmitTask};
use crate::remote::{is_not_found, ComputeApi, SubmitRunRequest, NOT_FOUND_REASON};
use crate::request::ExecutionRequest;
use crate::result::TabularResult;

const RUN_NAME: &str = "dbx-runner query";
const TASK_KEY: &str = "query";

/// Places a run's output may carry its row array.
const ROW_PATHS: [&[&str]; 3] = [
    &["data_array"],
    &["result", "data_array"],
    &["sql_output", "data_array"],
];

#[derive(Debug, Clone)]
pub struct JobStrategy {
    policy: PollPolicy,
}

impl JobStrategy {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ExecutionStrategy for JobStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Job
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
            RunnerError::Unsupported("job runs require a cluster target".into())
        })?;

        let submit = SubmitRunRequest {
            run_name: RUN_NAME.to_string(),
            existing_cluster_id: cluster_id.to_string(),
            tasks: vec![SubmitTask {
                task_key: TASK_KEY.to_string(),
                sql_task: SqlTask {
                    query: SqlTaskQuery {
                        query: request.statement.clone(),
                    },
                },
            }],
        };
        let run_id = cancellable(cancel, api.submit_run(credential, &submit)).await?;
        Ok(ExecutionHandle::JobRun { run_id })
    }

    async fn poll(
        &self,
        api: &dyn ComputeApi,
        credential: &Credential,
        handle: &ExecutionHandle,
    ) -> Result<PollOutcome<serde_json::Value>> {
        let ExecutionHandle::JobRun { run_id } = handle else {
            return Err(foreign_handle(self.kind(), handle));
        };

        let run = match api.get_run(credential, *run_id).await {
            Ok(run) => run,
            Err(e) if is_not_found(&e) => return Ok(PollOutcome::Failed(NOT_FOUND_REASON.into())),
            Err(e) => return Err(e),
        };

        let state = run.state;
        if state.life_cycle_state != "TERMINATED" {
            debug!("Run {} is {}", run_id, state.life_cycle_state);
            return Ok(PollOutcome::Pending);
        }

        if state.result_state.as_deref() != Some("SUCCESS") {
            let reason = state
                .state_message
                .filter(|m| !m.is_empty())
                .or(state.result_state)
                .unwrap_or_else(|| "run terminated without a result state".to_string());
            return Ok(PollOutcome::Failed(reason));
        }

        match api.get_run_output(credential, *run_id).await {
            Ok(output) => Ok(PollOutcome::Succeeded(output)),
            Err(e) if is_not_found(&e) => Ok(PollOutcome::Failed(NOT_FOUND_REASON.into())),
            Err(e) => Err(e),
        }
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
        let data = ROW_PATHS
            .iter()
            .find_map(|path| lookup(payload, path))
            .ok_or_else(|| RunnerError::malformed("run output carries no row data"))?;
        TabularResult::from_json_rows(None, data)
    }
}
