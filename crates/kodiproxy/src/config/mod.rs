//! Configuration management
//!
//! The proxy reads a single JSON file with one section per component. Every
//! key has a default, so a partial file (or an empty object) is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "kodiproxy.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub jrpc: JrpcConfig,
    pub receiver: ReceiverConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Where the proxy listens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/jsonrpc".to_string(),
        }
    }
}

/// The upstream JSON-RPC server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JrpcConfig {
    pub target: String,
    pub timeout_secs: u64,
}

impl Default for JrpcConfig {
    fn default() -> Self {
        Self {
            target: "http://localhost:8081/jsonrpc".to_string(),
            timeout_secs: 5,
        }
    }
}

impl JrpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReceiverConfig {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub desired_input: String,
    pub min_volume: f64,
    pub max_volume: f64,
    pub power_on_attempts: u32,
    pub power_on_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            ip: None,
            port: None,
            desired_input: "AUXB".to_string(),
            min_volume: -80.0,
            max_volume: -20.0,
            power_on_attempts: 8,
            power_on_delay_ms: 500,
            timeout_secs: 5,
        }
    }
}

impl ReceiverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn power_on_delay(&self) -> Duration {
        Duration::from_millis(self.power_on_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "cec-client".to_string(),
            args: vec!["-s".to_string(), "-d".to_string(), "1".to_string()],
            timeout_secs: 5,
        }
    }
}

impl DisplayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    Stdout,
    File,
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    #[serde(rename = "type")]
    pub sink: LogSink,
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            sink: LogSink::Stdout,
            path: "kodiproxy_log.txt".to_string(),
        }
    }
}

impl Config {
    /// Load and validate the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.receiver.min_volume >= self.receiver.max_volume {
            return Err(ConfigError::Invalid(format!(
                "receiver.minVolume ({}) must be lower than receiver.maxVolume ({})",
                self.receiver.min_volume, self.receiver.max_volume
            )));
        }
        if self.receiver.power_on_attempts == 0 {
            return Err(ConfigError::Invalid(
                "receiver.powerOnAttempts must be at least 1".to_string(),
            ));
        }
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.path must start with '/', got {:?}",
                self.server.path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.path, "/jsonrpc");
        assert_eq!(config.jrpc.target, "http://localhost:8081/jsonrpc");
        assert_eq!(config.jrpc.timeout(), Duration::from_secs(5));
        assert_eq!(config.receiver.desired_input, "AUXB");
        assert_eq!(config.receiver.min_volume, -80.0);
        assert_eq!(config.receiver.max_volume, -20.0);
        assert_eq!(config.receiver.power_on_attempts, 8);
        assert_eq!(config.receiver.power_on_delay(), Duration::from_millis(500));
        assert!(config.receiver.ip.is_none());
        assert_eq!(config.display.command, "cec-client");
        assert_eq!(config.display.timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.sink, LogSink::Stdout);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_json(
            r#"{
                "receiver": {"ip": "192.168.1.20", "port": 8080, "desiredInput": "DVD"},
                "logging": {"type": "null"},
                "server": {"port": 9090}
            }"#,
        )
        .unwrap();

        assert_eq!(config.receiver.ip.as_deref(), Some("192.168.1.20"));
        assert_eq!(config.receiver.port, Some(8080));
        assert_eq!(config.receiver.desired_input, "DVD");
        assert_eq!(config.receiver.max_volume, -20.0);
        assert_eq!(config.logging.sink, LogSink::Null);
        assert!(config.logging.enabled);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = Config::from_json(r#"{"jrpc": {"target": "http://kodi:80/jsonrpc", "extra": 1}}"#)
            .unwrap();
        assert_eq!(config.jrpc.target, "http://kodi:80/jsonrpc");
    }

    #[test]
    fn test_unknown_log_type_is_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"logging": {"type": "syslog"}}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_inverted_volume_bounds_are_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"receiver": {"minVolume": -20, "maxVolume": -80}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_power_on_attempts_is_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"receiver": {"powerOnAttempts": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("kodiproxy-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"jrpc": {"target": "http://media:8081/jsonrpc"}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.jrpc.target, "http://media:8081/jsonrpc");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/kodiproxy.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
