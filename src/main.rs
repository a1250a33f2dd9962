//! Musicly - a local music library.
//!
//! Scans folders into a SQLite library and answers queries and edits from the
//! command line.

use clap::Parser;
use musicly::cli;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(cli::log_filter(EnvFilter::from_default_env())?)
        .init();

    cli::run_command(&args)
}
