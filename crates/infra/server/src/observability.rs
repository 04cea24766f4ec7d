//! Logging setup for a process embedding the server.

use tracing_subscriber::filter::EnvFilter;

use crate::{ServerConfig, ServerError};

/// Installs the global `fmt` subscriber, filtered by [`log_filter`].
///
/// Fails if the process already installed a subscriber.
pub fn init_tracing(config: &ServerConfig) -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.log_level))
        .try_init()
        .map_err(|e| ServerError::Tracing(e.to_string()))
}

/// Creates the log filter, with `RUST_LOG` taking precedence over `level`.
pub fn log_filter(level: &str) -> EnvFilter {
    filter_from(std::env::var("RUST_LOG").ok().as_deref(), level)
}

fn filter_from(env: Option<&str>, level: &str) -> EnvFilter {
    let directive = env
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(level);

    EnvFilter::try_new(directive).unwrap_or_else(|_| {
        eprintln!("invalid log filter '{directive}', falling back to 'info'");
        EnvFilter::new("info")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_configured_level_is_used() {
        let filter = filter_from(None, "debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_env_takes_precedence() {
        let filter = filter_from(Some("warn"), "debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = filter_from(Some("  "), "error");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_invalid_directive_falls_back_to_info() {
        let filter = filter_from(None, "carwash=loudest");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
