//! Galley CLI binary.
//!
//! Entry point for the `galley` command-line tool. It parses arguments with
//! `clap`, initializes logging via `tracing`, and dispatches to the
//! appropriate command handler.

mod cli;
mod commands;

use miette::Result;
use tracing_subscriber::EnvFilter;

use galley_core::config::GlobalConfig;

fn main() -> Result<()> {
    let args = cli::parse();

    // --verbose beats RUST_LOG, which beats the global config's filter.
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let default = GlobalConfig::load()
                .map(|c| c.log.filter)
                .unwrap_or_else(|_| "warn".to_string());
            EnvFilter::new(default)
        })
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    commands::dispatch(args)
}
