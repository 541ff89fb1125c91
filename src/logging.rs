//! Logging setup for the command-line binary.
//!
//! Logs go to stderr so stdout stays clean for JSON output.

use tracing_subscriber::EnvFilter;

/// Returns the default filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initializes logging to stderr.
///
/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init_stderr_logging(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity))),
        )
        .with_writer(std::io::stderr)
        .init();
}
