//! Command-line interface
//!
//! `docforge serve` (the default) runs the stdio tool server on a
//! current-thread runtime: one tool invocation is processed end-to-end at a
//! time, so the in-memory stores need no locks. `docforge sweep` runs the
//! cache hygiene pass and exits.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing::info;

use docforge_config::Config;
use docforge_server::{build_dispatcher, serve};
use docforge_utils::logging::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "docforge", version, about = "Document generation tool server")]
struct Cli {
    /// Path to a docforge.toml (defaults to ./docforge.toml when present)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Suppress diagnostics below error level
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Run the stdio tool server (default)
    Serve,
    /// Remove stale fingerprint-cache entries and exit
    Sweep,
}

/// Parse arguments, load configuration, and run the requested command.
///
/// # Errors
///
/// Returns configuration and stdio failures; the caller maps them to the
/// process exit code.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("configuration loading failed")?;
    let quiet = cli.quiet || config.quiet;
    if let Err(err) = init_tracing(cli.verbose, quiet) {
        // A pre-installed subscriber (tests, embedding) is not fatal
        eprintln!("tracing init skipped: {err}");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("tokio runtime construction failed")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mut dispatcher = build_dispatcher(config)?;
            runtime.block_on(serve(&mut dispatcher))
        }
        Command::Sweep => {
            let mut dispatcher = build_dispatcher(config)?;
            let removed = dispatcher.sweep_cache();
            info!("sweep removed {removed} stale cache entries");
            println!("removed {removed} stale cache entries");
            Ok(())
        }
    }
}
