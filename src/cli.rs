//! Command-line argument parsing for dbx-runner.

use crate::config::Config;
use crate::error::{Result, RunnerError};
use crate::strategy::StrategyKind;
use clap::Parser;
use std::path::PathBuf;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned table with a row count.
    #[default]
    Text,
    /// JSON document with rows and the attempt trail.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Run a SQL statement on Databricks, falling back across execution APIs.
#[derive(Parser, Debug)]
#[command(name = "dbx-runner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL statement to run (default: the configured statement, or SHOW TABLES)
    #[arg(value_name = "STATEMENT")]
    pub statement: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Workspace URL (e.g., https://adb-123.4.azuredatabricks.net)
    #[arg(short = 'H', long, value_name = "URL")]
    pub host: Option<String>,

    /// Run on a SQL warehouse
    #[arg(short = 'w', long, value_name = "ID", conflicts_with = "cluster")]
    pub warehouse: Option<String>,

    /// Run on an all-purpose cluster
    #[arg(short = 'c', long, value_name = "ID")]
    pub cluster: Option<String>,

    /// Comma-separated strategies in fallback order (statement, command, job)
    #[arg(short = 's', long, value_name = "LIST")]
    pub strategies: Option<String>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Skip the cluster state check before running
    #[arg(long)]
    pub no_cluster_check: bool,

    /// Only obtain a token and print what it grants
    #[arg(long, conflicts_with = "list_clusters")]
    pub check_auth: bool,

    /// List the workspace's clusters instead of running a statement
    #[arg(long)]
    pub list_clusters: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Parses the output format from the --output argument.
    pub fn parse_output_format(&self) -> std::result::Result<OutputFormat, String> {
        self.output.parse()
    }

    /// Parses the --strategies list, if given.
    pub fn parse_strategies(&self) -> std::result::Result<Option<Vec<StrategyKind>>, String> {
        self.strategies
            .as_deref()
            .map(StrategyKind::parse_list)
            .transpose()
    }

    /// Applies CLI overrides on top of file configuration.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(statement) = &self.statement {
            config.run.statement = statement.clone();
        }
        if let Some(host) = &self.host {
            config.workspace.host = Some(host.clone());
        }

        // A target on the command line replaces whatever target the file names.
        if let Some(warehouse) = &self.warehouse {
            config.workspace.warehouse_id = Some(warehouse.clone());
            config.workspace.cluster_id = None;
        }
        if let Some(cluster) = &self.cluster {
            config.workspace.cluster_id = Some(cluster.clone());
            config.workspace.warehouse_id = None;
        }

        if let Some(kinds) = self.parse_strategies().map_err(RunnerError::config)? {
            config.run.select_strategies(&kinds);
        }
        if self.no_cluster_check {
            config.run.check_cluster_state = false;
        }
        Ok(())
    }
}
