//! Logging bootstrap for docforge
//!
//! Diagnostics go to stderr so the line-oriented RPC channel on stdout stays
//! clean. Filtering follows the usual precedence: an explicit `RUST_LOG`
//! wins, then the quiet/verbose flags, then the compact default.

use std::io::IsTerminal;
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if:
/// - stderr is a terminal (TTY)
/// - NO_COLOR environment variable is not set
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// * `verbose` lowers the filter to `docforge=debug,info`
/// * `quiet` suppresses everything below `error` (diagnostic silence for
///   clients that treat any stderr output as noise)
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if quiet {
        "error"
    } else if verbose {
        "docforge=debug,info"
    } else {
        "docforge=info,warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_color())
                .with_target(verbose)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
