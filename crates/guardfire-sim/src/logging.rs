//! Log subscriber set-up for hosts embedding the engine.
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the host. `init_logging` installs a compact console formatter or JSON lines.
//! `RUST_LOG` takes precedence over the configured level.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = LogInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" | "console" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogInitError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Include the emitting module path in each line.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            with_target: true,
        }
    }
}

/// Logging set-up failure.
#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("unknown log format `{0}` (expected compact or json)")]
    UnknownFormat(String),
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogInitError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.to_string())?,
    };

    match config.format {
        LogFormat::Compact => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(config.with_target)
                    .with_thread_ids(false)
                    .compact(),
            )
            .try_init()?,
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(config.with_target).json())
            .try_init()?,
    }
    Ok(())
}

/// Parse a level name, falling back to `INFO` for unknown names.
pub fn parse_log_level(level: &str) -> Level {
    Level::from_str(level).unwrap_or_else(|_| {
        tracing::warn!(level, "logging.unknown_level");
        Level::INFO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from_str("compact").ok(), Some(LogFormat::Compact));
        assert_eq!(LogFormat::from_str("JSON").ok(), Some(LogFormat::Json));
        assert!(matches!(
            LogFormat::from_str("xml"),
            Err(LogInitError::UnknownFormat(s)) if s == "xml"
        ));
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level("WARN"), Level::WARN);
        assert_eq!(parse_log_level("loud"), Level::INFO);
    }
}
