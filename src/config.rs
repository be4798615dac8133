//! Configuration management for dbx-runner.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! CLI flags are applied on top by [`crate::cli::Cli::apply_to`]; environment
//! variables only fill what is still unset.

use crate::auth::{OAuthConfig, DEFAULT_SCOPE};
use crate::error::{Result, RunnerError};
use crate::poll::PollPolicy;
use crate::request::{ExecutionRequest, Target};
use crate::strategy::{ExecutionStrategy, StrategyKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "SERVICE_PRINCIPAL_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SERVICE_PRINCIPAL_SECRET";
pub const ENV_HOST: &str = "DATABRICKS_HOST";
pub const ENV_WAREHOUSE_ID: &str = "DATABRICKS_WAREHOUSE_ID";
pub const ENV_CLUSTER_ID: &str = "DATABRICKS_CLUSTER_ID";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Identity authority and service principal.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Workspace and compute target.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// What to run and how.
    #[serde(default)]
    pub run: RunConfig,
}

/// Service-principal credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Full token endpoint. Takes precedence over `tenant_id`.
    pub token_url: Option<String>,

    /// Azure AD tenant; the token endpoint is derived from it.
    pub tenant_id: Option<String>,

    pub client_id: Option<String>,

    /// Client secret (prefer the environment over storing it here).
    pub client_secret: Option<String>,

    #[serde(default = "default_scope")]
    pub scope: String,

    /// Token request timeout in seconds.
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_auth_timeout() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            scope: default_scope(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_url", &self.token_url)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("scope", &self.scope)
            .finish()
    }
}

/// Workspace host and compute target.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspaceConfig {
    /// Workspace URL, e.g. `https://adb-123.4.azuredatabricks.net`.
    pub host: Option<String>,

    /// SQL warehouse id.
    pub warehouse_id: Option<String>,

    /// All-purpose cluster id.
    pub cluster_id: Option<String>,
}

/// Statement, wait hint, strategy order and preconditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_statement")]
    pub statement: String,

    /// Server-side wait hint for the statement API, in seconds.
    #[serde(default = "default_wait_hint")]
    pub wait_hint_secs: u64,

    /// Refuse to run anything unless the target cluster is RUNNING.
    #[serde(default = "default_true")]
    pub check_cluster_state: bool,

    /// Strategies to try, in order.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyConfig>,
}

fn default_statement() -> String {
    "SHOW TABLES".to_string()
}

fn default_wait_hint() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_strategies() -> Vec<StrategyConfig> {
    StrategyKind::ALL
        .iter()
        .map(|kind| StrategyConfig::new(*kind))
        .collect()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            statement: default_statement(),
            wait_hint_secs: default_wait_hint(),
            check_cluster_state: true,
            strategies: default_strategies(),
        }
    }
}

/// One entry of the fallback order. Unset budget fields use the kind's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub max_attempts: Option<u32>,
    pub interval_ms: Option<u64>,
}

impl StrategyConfig {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            max_attempts: None,
            interval_ms: None,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        let default = self.kind.default_policy();
        PollPolicy::new(
            self.max_attempts.unwrap_or(default.max_attempts),
            self.interval_ms
                .map(Duration::from_millis)
                .unwrap_or(default.interval),
        )
    }
}

impl RunConfig {
    /// Reorders the strategy list to `kinds`, keeping any configured budgets.
    pub fn select_strategies(&mut self, kinds: &[StrategyKind]) {
        self.strategies = kinds
            .iter()
            .map(|kind| {
                self.strategies
                    .iter()
                    .find(|s| s.kind == *kind)
                    .cloned()
                    .unwrap_or_else(|| StrategyConfig::new(*kind))
            })
            .collect();
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dbx-runner")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RunnerError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            RunnerError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Fills unset values from the process environment.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Fills unset values using `lookup` to read variables.
    ///
    /// The target is only taken from the environment when neither a warehouse nor a
    /// cluster is configured already.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let auth = &mut self.auth;
        if auth.token_url.is_none() && auth.tenant_id.is_none() {
            auth.tenant_id = lookup(ENV_TENANT_ID);
        }
        if auth.client_id.is_none() {
            auth.client_id = lookup(ENV_CLIENT_ID);
        }
        if auth.client_secret.is_none() {
            auth.client_secret = lookup(ENV_CLIENT_SECRET);
        }

        let workspace = &mut self.workspace;
        if workspace.host.is_none() {
            workspace.host = lookup(ENV_HOST);
        }
        if workspace.warehouse_id.is_none() && workspace.cluster_id.is_none() {
            workspace.warehouse_id = lookup(ENV_WAREHOUSE_ID);
            workspace.cluster_id = lookup(ENV_CLUSTER_ID);
        }
    }

    /// Builds the client-credentials configuration.
    pub fn oauth_config(&self) -> Result<OAuthConfig> {
        let auth = &self.auth;
        let token_url = match (&auth.token_url, &auth.tenant_id) {
            (Some(url), _) => {
                validate_url(url, "auth.token_url")?;
                url.clone()
            }
            (None, Some(tenant)) => OAuthConfig::azure_token_url(tenant),
            (None, None) => {
                return Err(RunnerError::config(format!(
                    "No identity authority configured. Set auth.token_url, auth.tenant_id or {ENV_TENANT_ID}"
                )))
            }
        };
        let client_id = required(&auth.client_id, "auth.client_id", ENV_CLIENT_ID)?;
        let client_secret = required(&auth.client_secret, "auth.client_secret", ENV_CLIENT_SECRET)?;

        Ok(OAuthConfig::new(token_url, client_id, client_secret)
            .with_scope(auth.scope.clone())
            .with_timeout(auth.timeout_secs))
    }

    /// Returns the validated workspace URL.
    pub fn workspace_host(&self) -> Result<String> {
        let host = required(&self.workspace.host, "workspace.host", ENV_HOST)?;
        validate_url(&host, "workspace.host")?;
        Ok(host)
    }

    /// Returns the compute target. A cluster wins when both ids are set, since every
    /// strategy can run against one.
    pub fn target(&self) -> Result<Target> {
        match (&self.workspace.warehouse_id, &self.workspace.cluster_id) {
            (Some(warehouse), Some(cluster)) => {
                warn!(
                    "Both warehouse {} and cluster {} configured; using the cluster",
                    warehouse, cluster
                );
                Ok(Target::Cluster(cluster.clone()))
            }
            (None, Some(cluster)) => Ok(Target::Cluster(cluster.clone())),
            (Some(warehouse), None) => Ok(Target::Warehouse(warehouse.clone())),
            (None, None) => Err(RunnerError::config(format!(
                "No compute target configured. Set workspace.warehouse_id or workspace.cluster_id \
                 ({ENV_WAREHOUSE_ID} / {ENV_CLUSTER_ID})"
            ))),
        }
    }

    /// Builds the execution request from the configured statement and target.
    pub fn request(&self) -> Result<ExecutionRequest> {
        let statement = self.run.statement.trim();
        if statement.is_empty() {
            return Err(RunnerError::config("Statement is empty"));
        }
        Ok(ExecutionRequest::new(statement, self.target()?)
            .with_wait_hint(Duration::from_secs(self.run.wait_hint_secs)))
    }

    /// Builds the strategies in fallback order.
    ///
    /// A strategy must be allowed at least one poll, otherwise it would submit work
    /// it never checks on.
    pub fn strategies(&self) -> Result<Vec<Box<dyn ExecutionStrategy>>> {
        let strategies = &self.run.strategies;
        if strategies.is_empty() {
            return Err(RunnerError::config("run.strategies must not be empty"));
        }
        if let Some(s) = strategies.iter().find(|s| s.max_attempts == Some(0)) {
            return Err(RunnerError::config(format!(
                "run.strategies: max_attempts for {} must be at least 1",
                s.kind
            )));
        }
        Ok(strategies.iter().map(|s| s.kind.build(s.policy())).collect())
    }
}

fn required(value: &Option<String>, key: &str, env: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| RunnerError::config(format!("Missing {key} (or {env})")))
}

fn validate_url(value: &str, key: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| RunnerError::config(format!("Invalid URL for {key} '{value}': {e}")))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(RunnerError::config(format!(
            "Invalid scheme '{}' for {key}. Expected 'https' or 'http'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(RunnerError::config(format!("{key} '{value}' has no host")));
    }
    Ok(())
}
