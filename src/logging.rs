//! Logging setup for the `daemon-config` binary.
//!
//! Uses `tracing-subscriber` with an `EnvFilter`. `RUST_LOG` takes precedence;
//! otherwise the level follows the daemon's `debug` option.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber, writing to stderr.
pub fn init(debug: bool) {
    init_with_writer(debug, std::io::stderr);
}

/// Initialize logging with a custom writer.
pub fn init_with_writer<W>(debug: bool, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    // A second initialisation (e.g. from tests) is not an error.
    let _ = fmt()
        .with_env_filter(filter(debug))
        .with_writer(writer)
        .with_target(false)
        .try_init();
}

fn filter(debug: bool) -> EnvFilter {
    let default_level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_level_follows_debug() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert_eq!(filter(true).to_string(), "debug");
        assert_eq!(filter(false).to_string(), "info");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_with_writer(false, std::io::sink);
        init_with_writer(true, std::io::sink);
    }
}
