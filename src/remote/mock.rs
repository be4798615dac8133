//! Scripted compute service for testing.
//!
//! Each endpoint replays a queue of canned responses. The last response of a queue
//! repeats forever, so a single `RUNNING` poll response keeps a strategy pending
//! until its poll budget runs out. Every call is logged in order.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::types::{
    ClusterInfo, CommandStatusResponse, CreateContextRequest, DestroyContextRequest,
    ExecuteCommandRequest, RunResponse, StatementRequest, StatementResponse, SubmitRunRequest,
};
use super::ComputeApi;
use crate::auth::Credential;
use crate::error::{Result, RunnerError};

/// One recorded call against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateStatement(StatementRequest),
    GetStatement(String),
    CreateContext { cluster_id: String },
    ExecuteCommand { context_id: String, command: String },
    CommandStatus { context_id: String, command_id: String },
    DestroyContext { context_id: String },
    SubmitRun { cluster_id: String },
    GetRun(i64),
    GetRunOutput(i64),
    GetCluster(String),
    ListClusters,
}

impl ApiCall {
    /// Returns true for calls that start work on the compute service.
    pub fn is_submit(&self) -> bool {
        matches!(
            self,
            Self::CreateStatement(_)
                | Self::CreateContext { .. }
                | Self::ExecuteCommand { .. }
                | Self::SubmitRun { .. }
        )
    }

    /// Returns true for status calls.
    pub fn is_poll(&self) -> bool {
        matches!(
            self,
            Self::GetStatement(_) | Self::CommandStatus { .. } | Self::GetRun(_)
        )
    }
}

struct Script<T> {
    name: &'static str,
    queue: VecDeque<Result<T>>,
}

impl<T: Clone> Script<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            queue: VecDeque::new(),
        }
    }

    fn push(&mut self, response: Result<T>) {
        self.queue.push_back(response);
    }

    fn next(&mut self) -> Result<T> {
        match self.queue.len() {
            0 => Err(RunnerError::internal(format!(
                "no scripted response for {}",
                self.name
            ))),
            1 => self.queue[0].clone(),
            _ => self
                .queue
                .pop_front()
                .unwrap_or_else(|| Err(RunnerError::internal("script drained"))),
        }
    }
}

struct MockState {
    calls: Vec<ApiCall>,
    tokens: Vec<String>,
    statement_submits: Script<StatementResponse>,
    statement_polls: Script<StatementResponse>,
    context_creates: Script<String>,
    command_executes: Script<String>,
    command_polls: Script<CommandStatusResponse>,
    context_destroys: Script<()>,
    run_submits: Script<i64>,
    run_polls: Script<RunResponse>,
    run_outputs: Script<serde_json::Value>,
    clusters: Script<ClusterInfo>,
    cluster_lists: Script<Vec<ClusterInfo>>,
}

/// A compute service whose responses are scripted per endpoint.
pub struct MockComputeApi {
    state: Mutex<MockState>,
}

impl MockComputeApi {
    /// Creates a fake with no scripted responses except a successful context teardown.
    pub fn new() -> Self {
        let mut context_destroys = Script::new("contexts/destroy");
        context_destroys.push(Ok(()));

        Self {
            state: Mutex::new(MockState {
                calls: Vec::new(),
                tokens: Vec::new(),
                statement_submits: Script::new("sql/statements"),
                statement_polls: Script::new("sql/statements/{id}"),
                context_creates: Script::new("contexts/create"),
                command_executes: Script::new("commands/execute"),
                command_polls: Script::new("commands/status"),
                context_destroys,
                run_submits: Script::new("jobs/runs/submit"),
                run_polls: Script::new("jobs/runs/get"),
                run_outputs: Script::new("jobs/runs/get-output"),
                clusters: Script::new("clusters/get"),
                cluster_lists: Script::new("clusters/list"),
            }),
        }
    }

    fn with(self, f: impl FnOnce(&mut MockState)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut *state);
        }
        self
    }

    pub fn on_statement_submit(self, response: Result<StatementResponse>) -> Self {
        self.with(|s| s.statement_submits.push(response))
    }

    pub fn on_statement_poll(self, response: Result<StatementResponse>) -> Self {
        self.with(|s| s.statement_polls.push(response))
    }

    pub fn on_context_create(self, response: Result<String>) -> Self {
        self.with(|s| s.context_creates.push(response))
    }

    pub fn on_command_execute(self, response: Result<String>) -> Self {
        self.with(|s| s.command_executes.push(response))
    }

    pub fn on_command_poll(self, response: Result<CommandStatusResponse>) -> Self {
        self.with(|s| s.command_polls.push(response))
    }

    /// Replaces the default successful teardown.
    pub fn on_context_destroy(self, response: Result<()>) -> Self {
        self.with(|s| {
            s.context_destroys.queue.clear();
            s.context_destroys.push(response);
        })
    }

    pub fn on_run_submit(self, response: Result<i64>) -> Self {
        self.with(|s| s.run_submits.push(response))
    }

    pub fn on_run_poll(self, response: Result<RunResponse>) -> Self {
        self.with(|s| s.run_polls.push(response))
    }

    pub fn on_run_output(self, response: Result<serde_json::Value>) -> Self {
        self.with(|s| s.run_outputs.push(response))
    }

    pub fn on_cluster(self, response: Result<ClusterInfo>) -> Self {
        self.with(|s| s.clusters.push(response))
    }

    pub fn on_cluster_list(self, response: Result<Vec<ClusterInfo>>) -> Self {
        self.with(|s| s.cluster_lists.push(response))
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Counts calls matching a predicate.
    pub fn count(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Bearer tokens seen, one per call.
    pub fn tokens(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.tokens.clone())
            .unwrap_or_default()
    }

    fn record<T>(
        &self,
        credential: &Credential,
        call: ApiCall,
        pick: impl FnOnce(&mut MockState) -> Result<T>,
    ) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RunnerError::internal("mock state poisoned"))?;
        state.calls.push(call);
        state.tokens.push(credential.token.clone());
        pick(&mut *state)
    }
}

impl Default for MockComputeApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComputeApi for MockComputeApi {
    async fn create_statement(
        &self,
        credential: &Credential,
        request: &StatementRequest,
    ) -> Result<StatementResponse> {
        self.record(credential, ApiCall::CreateStatement(request.clone()), |s| {
            s.statement_submits.next()
        })
    }

    async fn get_statement(
        &self,
        credential: &Credential,
        statement_id: &str,
    ) -> Result<StatementResponse> {
        self.record(
            credential,
            ApiCall::GetStatement(statement_id.to_string()),
            |s| s.statement_polls.next(),
        )
    }

    async fn create_context(
        &self,
        credential: &Credential,
        request: &CreateContextRequest,
    ) -> Result<String> {
        let call = ApiCall::CreateContext {
            cluster_id: request.cluster_id.clone(),
        };
        self.record(credential, call, |s| s.context_creates.next())
    }

    async fn execute_command(
        &self,
        credential: &Credential,
        request: &ExecuteCommandRequest,
    ) -> Result<String> {
        let call = ApiCall::ExecuteCommand {
            context_id: request.context_id.clone(),
            command: request.command.clone(),
        };
        self.record(credential, call, |s| s.command_executes.next())
    }

    async fn command_status(
        &self,
        credential: &Credential,
        _cluster_id: &str,
        context_id: &str,
        command_id: &str,
    ) -> Result<CommandStatusResponse> {
        let call = ApiCall::CommandStatus {
            context_id: context_id.to_string(),
            command_id: command_id.to_string(),
        };
        self.record(credential, call, |s| s.command_polls.next())
    }

    async fn destroy_context(
        &self,
        credential: &Credential,
        request: &DestroyContextRequest,
    ) -> Result<()> {
        let call = ApiCall::DestroyContext {
            context_id: request.context_id.clone(),
        };
        self.record(credential, call, |s| s.context_destroys.next())
    }

    async fn submit_run(
        &self,
        credential: &Credential,
        request: &SubmitRunRequest,
    ) -> Result<i64> {
        let call = ApiCall::SubmitRun {
            cluster_id: request.existing_cluster_id.clone(),
        };
        self.record(credential, call, |s| s.run_submits.next())
    }

    async fn get_run(&self, credential: &Credential, run_id: i64) -> Result<RunResponse> {
        self.record(credential, ApiCall::GetRun(run_id), |s| s.run_polls.next())
    }

    async fn get_run_output(
        &self,
        credential: &Credential,
        run_id: i64,
    ) -> Result<serde_json::Value> {
        self.record(credential, ApiCall::GetRunOutput(run_id), |s| {
            s.run_outputs.next()
        })
    }

    async fn get_cluster(&self, credential: &Credential, cluster_id: &str) -> Result<ClusterInfo> {
        self.record(credential, ApiCall::GetCluster(cluster_id.to_string()), |s| {
            s.clusters.next()
        })
    }

    async fn list_clusters(&self, credential: &Credential) -> Result<Vec<ClusterInfo>> {
        self.record(credential, ApiCall::ListClusters, |s| s.cluster_lists.next())
    }
}
