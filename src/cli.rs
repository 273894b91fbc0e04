//! Command-line flags layered on top of `Config::from_env`.
//!
//! The only flags this binary accepts are a log-level override and an
//! optional migration-only mode; everything else is still read from the
//! environment by `Config::from_env`.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Media acquisition orchestrator", long_about = None)]
pub struct Args {
    /// Override the `RUST_LOG`-style filter directive.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Run pending database migrations then exit, without starting the
    /// HTTP server or reconciler.
    #[arg(long)]
    pub migrate_only: bool,
}
