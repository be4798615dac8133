//! dbx-runner - run a SQL statement on Databricks with fallback across execution APIs.

use dbx_runner::auth::{hint_for, OAuthClient, TokenProvider};
use dbx_runner::cli::{Cli, OutputFormat};
use dbx_runner::config::Config;
use dbx_runner::logging::init_stderr_logging;
use dbx_runner::output::{render_attempts, render_clusters, render_credential, render_report};
use dbx_runner::poll::cancellable;
use dbx_runner::{AttemptOutcome, Orchestrator, Result, RunnerError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// All strategies were tried and none produced rows.
const EXIT_EXHAUSTED: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_stderr_logging(cli.verbose);

    if let Err(e) = run(&cli).await {
        std::process::exit(report_error(&e));
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring .env file: {}", e),
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    // Precedence: CLI flags, then the config file, then the environment.
    cli.apply_to(&mut config)?;
    config.apply_env_defaults();

    let format = cli.parse_output_format().map_err(RunnerError::config)?;

    let cancel = CancellationToken::new();
    watch_for_interrupt(cancel.clone());

    if cli.check_auth {
        return check_auth(&config, format, &cancel).await;
    }
    if cli.list_clusters {
        let clusters = Orchestrator::from_config(&config)?
            .list_clusters(&cancel)
            .await?;
        print!("{}", render_clusters(&clusters, format));
        return Ok(());
    }

    let request = config.request()?;
    let strategies = config.strategies()?;
    let orchestrator = Orchestrator::from_config(&config)?;

    info!(
        "Running {:?} on {} with {} strateg{}",
        request.statement,
        request.target,
        strategies.len(),
        if strategies.len() == 1 { "y" } else { "ies" }
    );
    let report = orchestrator.run(&request, &strategies, &cancel).await?;

    print!("{}", render_report(&report, format));
    Ok(())
}

/// Obtains a token and prints what it grants.
async fn check_auth(
    config: &Config,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let client = OAuthClient::new(config.oauth_config()?)?;
    let credential = cancellable(cancel, client.obtain_token()).await?;
    print!("{}", render_credential(&credential, format));
    Ok(())
}

/// Cancels the run on Ctrl-C.
fn watch_for_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });
}

/// Logs an error and returns the process exit code for it.
fn report_error(e: &RunnerError) -> i32 {
    error!("{}: {}", e.category(), e);
    match e {
        RunnerError::Exhausted { attempts } => {
            eprintln!("Attempts:\n{}", render_attempts(attempts));
            if attempts
                .iter()
                .any(|a| a.outcome == AttemptOutcome::PreconditionFailed)
            {
                eprintln!("Hint: start the cluster, or run with --list-clusters to pick another");
            }
            EXIT_EXHAUSTED
        }
        RunnerError::Auth { code, .. } => {
            if let Some(hint) = hint_for(code) {
                eprintln!("Hint: {hint}");
            }
            1
        }
        _ => 1,
    }
}
