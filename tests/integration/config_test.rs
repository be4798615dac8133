//! Configuration loading tests.
//!
//! Load real TOML files from a temporary directory and layer CLI flags on top.

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use dbx_runner::cli::Cli;
use dbx_runner::config::{Config, ENV_CLIENT_SECRET, ENV_CLUSTER_ID, ENV_HOST};
use dbx_runner::poll::PollPolicy;
use dbx_runner::request::Target;
use dbx_runner::strategy::StrategyKind;
use dbx_runner::RunnerError;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

const CONFIG: &str = r#"
[auth]
tenant_id = "tenant-1"
client_id = "app-1"

[workspace]
host = "https://adb-1.azuredatabricks.net"
warehouse_id = "w-file"

[run]
statement = "SELECT current_date()"
wait_hint_secs = 30

[[run.strategies]]
kind = "statement"
max_attempts = 10
interval_ms = 500

[[run.strategies]]
kind = "job"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |name| {
        vars.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = assert_ok!(Config::load_from_file(&dir.path().join("absent.toml")));
    assert_eq!(config.run.statement, "SHOW TABLES");
    assert_eq!(config.run.strategies.len(), 3);
}

#[test]
fn test_load_file_builds_request_and_strategies() {
    let file = write_config(CONFIG);
    let config = assert_ok!(Config::load_from_file(file.path()));

    let request = assert_ok!(config.request());
    assert_eq!(request.statement, "SELECT current_date()");
    assert_eq!(request.target, Target::Warehouse("w-file".into()));
    assert_eq!(request.wait_timeout(), "30s");

    let strategies = config.strategies().unwrap();
    let built: Vec<_> = strategies.iter().map(|s| (s.kind(), s.policy())).collect();
    assert_eq!(
        built,
        vec![
            (
                StrategyKind::Statement,
                PollPolicy::new(10, Duration::from_millis(500))
            ),
            (StrategyKind::Job, StrategyKind::Job.default_policy()),
        ]
    );
}

#[test]
fn test_invalid_file_names_the_path() {
    let file = write_config("[run\nstatement = ");
    let err = assert_err!(Config::load_from_file(file.path()));

    assert!(matches!(err, RunnerError::Config(_)));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn test_cli_over_file_over_env() {
    let file = write_config(CONFIG);
    let mut config = Config::load_from_file(file.path()).unwrap();

    let cli = Cli::parse_from([
        "dbx-runner",
        "--cluster",
        "c-cli",
        "--strategies",
        "job,statement",
    ]);
    cli.apply_to(&mut config).unwrap();
    config.apply_env_with(env(&[
        (ENV_HOST, "https://from-env.net"),
        (ENV_CLUSTER_ID, "c-env"),
        (ENV_CLIENT_SECRET, "secret"),
    ]));

    assert_eq!(config.target().unwrap(), Target::Cluster("c-cli".into()));
    assert_eq!(
        config.workspace_host().unwrap(),
        "https://adb-1.azuredatabricks.net"
    );

    let kinds: Vec<_> = config.run.strategies.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![StrategyKind::Job, StrategyKind::Statement]);
    // Budgets configured in the file survive reordering.
    assert_eq!(config.run.strategies[1].max_attempts, Some(10));

    let oauth = config.oauth_config().unwrap();
    assert_eq!(oauth.client_id, "app-1");
    assert_eq!(oauth.client_secret, "secret");
    assert!(oauth.token_url.contains("tenant-1"));
}

#[test]
fn test_zero_poll_budget_in_file_is_rejected() {
    let file = write_config("[[run.strategies]]\nkind = \"job\"\nmax_attempts = 0\n");
    let config = assert_ok!(Config::load_from_file(file.path()));

    let err = config.strategies().err();
    assert!(matches!(err, Some(RunnerError::Config(_))));
}

#[test]
fn test_orchestrator_from_incomplete_config() {
    let file = write_config("[workspace]\nhost = \"https://adb.net\"\n");
    let config = Config::load_from_file(file.path()).unwrap();

    let err = dbx_runner::Orchestrator::from_config(&config).err();
    assert!(matches!(err, Some(RunnerError::Config(_))));
}
