//! Request and response bodies for the compute service endpoints.
//!
//! Result payloads stay as raw JSON so that strategies can report a malformed
//! payload as a result error instead of a decode failure.

use serde::{Deserialize, Serialize};

// === Statement execution API ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    pub statement: String,
    pub wait_timeout: String,
    /// What the service does when `wait_timeout` elapses: `CONTINUE` keeps the statement running.
    pub on_wait_timeout: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResponse {
    pub statement_id: String,
    #[serde(default)]
    pub status: Option<StatementStatus>,
    #[serde(default)]
    pub manifest: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl StatementResponse {
    /// A response carrying only a state, as returned while the statement runs.
    pub fn with_state(statement_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            statement_id: statement_id.into(),
            status: Some(StatementStatus {
                state: state.into(),
                error: None,
            }),
            ..Default::default()
        }
    }

    /// A `SUCCEEDED` response whose result carries `data_array`.
    pub fn succeeded(statement_id: impl Into<String>, data_array: serde_json::Value) -> Self {
        Self {
            result: Some(serde_json::json!({ "data_array": data_array })),
            ..Self::with_state(statement_id, "SUCCEEDED")
        }
    }

    pub fn state(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.state.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementStatus {
    pub state: String,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// === Command execution API (1.2) ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContextRequest {
    pub cluster_id: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandRequest {
    pub cluster_id: String,
    pub context_id: String,
    pub language: String,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyContextRequest {
    pub cluster_id: String,
    pub context_id: String,
}

/// Response of `contexts/create` and `commands/execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandStatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub results: Option<serde_json::Value>,
}

impl CommandStatusResponse {
    pub fn new(status: impl Into<String>, results: Option<serde_json::Value>) -> Self {
        Self {
            id: None,
            status: status.into(),
            results,
        }
    }
}

// === Jobs API (2.1) ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitRunRequest {
    pub run_name: String,
    pub existing_cluster_id: String,
    pub tasks: Vec<SubmitTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitTask {
    pub task_key: String,
    pub sql_task: SqlTask,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlTask {
    pub query: SqlTaskQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlTaskQuery {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRunResponse {
    pub run_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub run_id: Option<i64>,
    pub state: RunState,
}

impl RunResponse {
    pub fn new(
        life_cycle_state: impl Into<String>,
        result_state: Option<&str>,
        state_message: Option<&str>,
    ) -> Self {
        Self {
            run_id: None,
            state: RunState {
                life_cycle_state: life_cycle_state.into(),
                result_state: result_state.map(String::from),
                state_message: state_message.map(String::from),
            },
        }
    }
}

/// Life-cycle and result dimensions of a job run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunState {
    pub life_cycle_state: String,
    #[serde(default)]
    pub result_state: Option<String>,
    #[serde(default)]
    pub state_message: Option<String>,
}

// === Clusters API ===

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
    pub state: String,
    #[serde(default)]
    pub state_message: Option<String>,
    #[serde(default)]
    pub spark_version: Option<String>,
    #[serde(default)]
    pub driver_node_type_id: Option<String>,
    /// Who created the cluster (`UI`, `API`, `JOB`, ...).
    #[serde(default)]
    pub cluster_source: Option<String>,
}

impl ClusterInfo {
    pub fn with_state(cluster_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            state: state.into(),
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == "RUNNING"
    }
}

/// Response of `clusters/list`. An empty workspace omits `clusters` entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterList {
    #[serde(default)]
    pub clusters: Vec<ClusterInfo>,
}
