//! HTTP implementation of the compute service client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::{
    ClusterInfo, ClusterList, CommandStatusResponse, CreateContextRequest, DestroyContextRequest,
    ExecuteCommandRequest, IdResponse, RunResponse, StatementRequest, StatementResponse,
    SubmitRunRequest, SubmitRunResponse,
};
use super::ComputeApi;
use crate::auth::Credential;
use crate::error::{Result, RunnerError};

/// Default timeout for a single API request.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Which kind of operation a request belongs to; decides the error it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Submit,
    Poll,
    Cleanup,
}

impl Phase {
    fn error(self, status: u16, body: String) -> RunnerError {
        match self {
            Self::Submit => RunnerError::Submit { status, body },
            Self::Poll => RunnerError::Poll { status, body },
            Self::Cleanup => RunnerError::Cleanup { status, body },
        }
    }
}

/// Client for a Databricks workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    host: String,
    client: Client,
}

impl WorkspaceClient {
    /// Creates a client for the workspace at `host` (e.g. `https://adb-123.azuredatabricks.net`).
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_timeout(host, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(host: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RunnerError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            host: host.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    async fn post<B, R>(
        &self,
        credential: &Credential,
        path: &str,
        body: &B,
        phase: Phase,
    ) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        self.send(credential, "POST", path, request, phase).await
    }

    async fn get<R>(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
        phase: Phase,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let request = self.client.get(self.url(path)).query(query);
        self.send(credential, "GET", path, request, phase).await
    }

    async fn send<R>(
        &self,
        credential: &Credential,
        method: &str,
        path: &str,
        request: RequestBuilder,
        phase: Phase,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let response = request
            .header("Authorization", credential.bearer())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            "{} {} -> {} ({} ms)",
            method,
            path,
            status,
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(phase.error(status.as_u16(), body));
        }

        // Empty bodies (e.g. contexts/destroy) decode as JSON null.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| match phase {
            Phase::Poll => RunnerError::malformed(format!("{path}: {e}")),
            _ => phase.error(status.as_u16(), format!("unexpected response from {path}: {e}")),
        })
    }
}

#[async_trait]
impl ComputeApi for WorkspaceClient {
    async fn create_statement(
        &self,
        credential: &Credential,
        request: &StatementRequest,
    ) -> Result<StatementResponse> {
        self.post(credential, "/api/2.0/sql/statements", request, Phase::Submit)
            .await
    }

    async fn get_statement(
        &self,
        credential: &Credential,
        statement_id: &str,
    ) -> Result<StatementResponse> {
        let path = format!("/api/2.0/sql/statements/{statement_id}");
        self.get(credential, &path, &[], Phase::Poll).await
    }

    async fn create_context(
        &self,
        credential: &Credential,
        request: &CreateContextRequest,
    ) -> Result<String> {
        let response: IdResponse = self
            .post(credential, "/api/1.2/contexts/create", request, Phase::Submit)
            .await?;
        Ok(response.id)
    }

    async fn execute_command(
        &self,
        credential: &Credential,
        request: &ExecuteCommandRequest,
    ) -> Result<String> {
        let response: IdResponse = self
            .post(credential, "/api/1.2/commands/execute", request, Phase::Submit)
            .await?;
        Ok(response.id)
    }

    async fn command_status(
        &self,
        credential: &Credential,
        cluster_id: &str,
        context_id: &str,
        command_id: &str,
    ) -> Result<CommandStatusResponse> {
        let query = [
            ("clusterId", cluster_id.to_string()),
            ("contextId", context_id.to_string()),
            ("commandId", command_id.to_string()),
        ];
        self.get(credential, "/api/1.2/commands/status", &query, Phase::Poll)
            .await
    }

    async fn destroy_context(
        &self,
        credential: &Credential,
        request: &DestroyContextRequest,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .post(credential, "/api/1.2/contexts/destroy", request, Phase::Cleanup)
            .await?;
        Ok(())
    }

    async fn submit_run(
        &self,
        credential: &Credential,
        request: &SubmitRunRequest,
    ) -> Result<i64> {
        let response: SubmitRunResponse = self
            .post(credential, "/api/2.1/jobs/runs/submit", request, Phase::Submit)
            .await?;
        Ok(response.run_id)
    }

    async fn get_run(&self, credential: &Credential, run_id: i64) -> Result<RunResponse> {
        let query = [("run_id", run_id.to_string())];
        self.get(credential, "/api/2.1/jobs/runs/get", &query, Phase::Poll)
            .await
    }

    async fn get_run_output(
        &self,
        credential: &Credential,
        run_id: i64,
    ) -> Result<serde_json::Value> {
        let query = [("run_id", run_id.to_string())];
        self.get(credential, "/api/2.1/jobs/runs/get-output", &query, Phase::Poll)
            .await
    }

    async fn get_cluster(&self, credential: &Credential, cluster_id: &str) -> Result<ClusterInfo> {
        let query = [("cluster_id", cluster_id.to_string())];
        self.get(credential, "/api/2.0/clusters/get", &query, Phase::Poll)
            .await
    }

    async fn list_clusters(&self, credential: &Credential) -> Result<Vec<ClusterInfo>> {
        let list: ClusterList = self
            .get(credential, "/api/2.0/clusters/list", &[], Phase::Poll)
            .await?;
        Ok(list.clusters)
    }
}
