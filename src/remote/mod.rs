//! Compute service client.
//!
//! Provides a trait over the submit, status and teardown endpoints each execution
//! strategy needs, so strategies can run against the real workspace or a scripted fake.

mod http;
mod mock;
pub mod types;

pub use http::WorkspaceClient;
pub use mock::{ApiCall, MockComputeApi};
pub use types::{
    ClusterInfo, ClusterList, CommandStatusResponse, CreateContextRequest, DestroyContextRequest,
    ExecuteCommandRequest, RunResponse, StatementRequest, StatementResponse, SubmitRunRequest,
};

use async_trait::async_trait;

use crate::auth::Credential;
use crate::error::{Result, RunnerError};

/// Failure reason reported when a status endpoint answers 404.
pub const NOT_FOUND_REASON: &str = "resource not found or not accessible";

/// Trait defining the compute service operations used by the execution strategies.
///
/// Every call is authenticated with the run's single credential. Submit calls fail
/// with `RunnerError::Submit`, status calls with `RunnerError::Poll` and teardown
/// calls with `RunnerError::Cleanup`.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// `POST /api/2.0/sql/statements`
    async fn create_statement(
        &self,
        credential: &Credential,
        request: &StatementRequest,
    ) -> Result<StatementResponse>;

    /// `GET /api/2.0/sql/statements/{id}`
    async fn get_statement(
        &self,
        credential: &Credential,
        statement_id: &str,
    ) -> Result<StatementResponse>;

    /// `POST /api/1.2/contexts/create`, returning the context id.
    async fn create_context(
        &self,
        credential: &Credential,
        request: &CreateContextRequest,
    ) -> Result<String>;

    /// `POST /api/1.2/commands/execute`, returning the command id.
    async fn execute_command(
        &self,
        credential: &Credential,
        request: &ExecuteCommandRequest,
    ) -> Result<String>;

    /// `GET /api/1.2/commands/status`
    async fn command_status(
        &self,
        credential: &Credential,
        cluster_id: &str,
        context_id: &str,
        command_id: &str,
    ) -> Result<CommandStatusResponse>;

    /// `POST /api/1.2/contexts/destroy`
    async fn destroy_context(
        &self,
        credential: &Credential,
        request: &DestroyContextRequest,
    ) -> Result<()>;

    /// `POST /api/2.1/jobs/runs/submit`, returning the run id.
    async fn submit_run(&self, credential: &Credential, request: &SubmitRunRequest)
        -> Result<i64>;

    /// `GET /api/2.1/jobs/runs/get`
    async fn get_run(&self, credential: &Credential, run_id: i64) -> Result<RunResponse>;

    /// `GET /api/2.1/jobs/runs/get-output`
    async fn get_run_output(
        &self,
        credential: &Credential,
        run_id: i64,
    ) -> Result<serde_json::Value>;

    /// `GET /api/2.0/clusters/get`
    async fn get_cluster(&self, credential: &Credential, cluster_id: &str)
        -> Result<ClusterInfo>;

    /// `GET /api/2.0/clusters/list`
    async fn list_clusters(&self, credential: &Credential) -> Result<Vec<ClusterInfo>>;
}

/// Returns true when a status call failed because the resource is gone.
///
/// A stopped or missing cluster answers 404; strategies report it as a failed
/// attempt rather than a poll error.
pub fn is_not_found(err: &RunnerError) -> bool {
    matches!(err, RunnerError::Poll { status: 404, .. })
}
