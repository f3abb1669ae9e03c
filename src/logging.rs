//! Structured logging setup for scorekv
//!
//! Installs a tracing subscriber driven by the logging section of the
//! configuration. Initialization is idempotent so tests that spin up
//! multiple servers in one process do not trip over an already-set
//! global subscriber.

use crate::config::{Config, LogFormat};
use crate::error::{Result, ScoreKvError};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber from configuration.
pub fn init_logging(config: &Config) -> Result<()> {
    let level = parse_log_level(&config.logging.level)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = fmt().with_env_filter(env_filter).with_target(true);

    let result = match config.logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
    Ok(())
}

fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ScoreKvError::ConfigError {
            message: format!("Invalid log level: {level_str}"),
            config_key: Some("logging.level".to_string()),
            source: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels_parse_case_insensitively() {
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("Warn").unwrap(), Level::WARN);
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn init_is_idempotent() {
        let config = Config::default();
        init_logging(&config).unwrap();
        init_logging(&config).unwrap();
    }
}
