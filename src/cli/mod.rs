//! Command-line interface for musicly.
//!
//! Every library operation is reachable as a subcommand, so a UI process can
//! drive the library by spawning the binary and reading JSON from stdout.

mod commands;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

pub use commands::{Cli, Commands, run_command};

/// Directive added on top of `RUST_LOG`. Every log target in the crate lives
/// under `musicly::`.
pub const DEFAULT_LOG_DIRECTIVE: &str = "musicly=info";

/// Extend a filter with [`DEFAULT_LOG_DIRECTIVE`].
pub fn log_filter(base: EnvFilter) -> Result<EnvFilter, ParseError> {
    Ok(base.add_directive(DEFAULT_LOG_DIRECTIVE.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_default_filter_admits_library_warnings() {
        let filter = log_filter(EnvFilter::new("")).unwrap();
        let subscriber = tracing_subscriber::registry().with(filter);

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "musicly::library::scan", Level::WARN));
            assert!(tracing::enabled!(target: "musicly::library::cover", Level::WARN));
            assert!(tracing::enabled!(target: "musicly::store", Level::INFO));
            assert!(!tracing::enabled!(target: "musicly::store", Level::DEBUG));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::INFO));
        });
    }
}
