//! docforge CLI binary
//!
//! Minimal entrypoint; all logic is in the library. Diagnostics go to
//! stderr, the RPC channel owns stdout.

fn main() {
    if let Err(err) = docforge::cli::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
