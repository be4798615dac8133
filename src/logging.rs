//! Logging configuration for dbx-runner.
//!
//! Logs go to stderr so stdout carries only the result.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `verbose`.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Default filter directives. HTTP internals stay at warn even when verbose.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "debug,hyper=warn,reqwest=warn,rustls=warn,h2=warn"
    } else {
        "info"
    }
}
