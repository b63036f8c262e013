//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. the level passed by the caller (if any)
//! 2. `DAGRUN_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs go to STDERR.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::fmt;

/// Name of the environment variable consulted when no level is given.
pub const LOG_ENV: &str = "DAGRUN_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init(level: Option<Level>) -> Result<()> {
    let level = level.unwrap_or_else(level_from_env);

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

fn level_from_env() -> Level {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(Level::INFO)
}

/// Parse a level name, case-insensitive. Accepts "warning" for warn.
pub fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level(" warning "), Some(Level::WARN));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init(Some(Level::WARN));
        assert!(init(Some(Level::WARN)).is_err());
    }
}
