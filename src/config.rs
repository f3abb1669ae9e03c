//! Configuration management for scorekv
//!
//! Configuration is layered: compiled-in defaults, then an optional TOML
//! file, then environment variable overrides for the common knobs.

use crate::error::{Result, ScoreKvError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the scorekv server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
    pub max_connections: usize,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub tcp_nodelay: bool,
    /// Seconds an idle connection may sit between requests before it is closed
    pub read_timeout: u64,
    /// Seconds a response write may take before the connection is closed
    pub write_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "127.0.0.1".to_string(),
            max_connections: 10_000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            read_timeout: 300,
            write_timeout: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from the default locations: `SCOREKV_CONFIG` if
    /// set, otherwise `./scorekv.toml` if present, otherwise defaults.
    /// Environment overrides are applied in every case.
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(path) = std::env::var("SCOREKV_CONFIG") {
            Self::from_toml_file(Path::new(&path))?
        } else {
            let default_path = Path::new("scorekv.toml");
            if default_path.exists() {
                Self::from_toml_file(default_path)?
            } else {
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file path, or defaults when
    /// `path` is `None`. Environment overrides still apply.
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ScoreKvError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
            config_key: None,
            source: Some(Box::new(e)),
        })?;
        toml::from_str(&contents).map_err(|e| ScoreKvError::ConfigError {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
            config_key: None,
            source: Some(Box::new(e)),
        })
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("SCOREKV_PORT") {
            self.server.port = port.parse().map_err(|e| ScoreKvError::ConfigError {
                message: format!("Invalid SCOREKV_PORT value '{port}'"),
                config_key: Some("server.port".to_string()),
                source: Some(Box::new(e)),
            })?;
        }
        if let Ok(addr) = std::env::var("SCOREKV_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Ok(level) = std::env::var("SCOREKV_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            return Err(ScoreKvError::ConfigError {
                message: "max_connections must be at least 1".to_string(),
                config_key: Some("server.max_connections".to_string()),
                source: None,
            });
        }
        if self.network.read_timeout == 0 || self.network.write_timeout == 0 {
            return Err(ScoreKvError::ConfigError {
                message: "network timeouts must be at least 1 second".to_string(),
                config_key: Some("network".to_string()),
                source: None,
            });
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ScoreKvError::ConfigError {
                message: format!("Invalid log level: {}", self.logging.level),
                config_key: Some("logging.level".to_string()),
                source: None,
            });
        }
        Ok(())
    }

    /// Write a commented sample configuration file.
    pub fn create_sample_config(path: &Path) -> Result<()> {
        let sample = r#"# scorekv configuration

[server]
port = 8080
bind_address = "127.0.0.1"
max_connections = 10000

[network]
tcp_nodelay = true
read_timeout = 300
write_timeout = 30

[logging]
level = "info"
format = "pretty"
"#;
        std::fs::write(path, sample).map_err(|e| ScoreKvError::ConfigError {
            message: format!("Failed to write sample config {}: {}", path.display(), e),
            config_key: None,
            source: Some(Box::new(e)),
        })
    }
}
