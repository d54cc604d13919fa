//! Configuration for SendPace

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Messaging bridge configuration
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Interactive dispatch pacing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Scheduled batch processing
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database backend (only "sqlite" is supported)
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// Full database URL, takes precedence over `path`
    pub url: Option<String>,

    /// Database file path
    pub path: Option<PathBuf>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_backend() -> String {
    "sqlite".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Messaging bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Base URL of the automation bridge
    #[serde(default = "default_messaging_url")]
    pub base_url: String,

    /// Transport-level request timeout in seconds
    #[serde(default = "default_messaging_timeout")]
    pub timeout_secs: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            base_url: default_messaging_url(),
            timeout_secs: default_messaging_timeout(),
        }
    }
}

fn default_messaging_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_messaging_timeout() -> u64 {
    120
}

/// Pacing for the interactive dispatch queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Lower bound of the safety delay in milliseconds
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the safety delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Fixed delay after a failed send in milliseconds
    #[serde(default = "default_failure_delay_ms")]
    pub failure_delay_ms: u64,

    /// Number of log entries kept per dispatch operation
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            failure_delay_ms: default_failure_delay_ms(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_min_delay_ms() -> u64 {
    15_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_failure_delay_ms() -> u64 {
    5_000
}

fn default_log_capacity() -> usize {
    200
}

/// Scheduled batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the scheduled batch processor
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Interval between processor ticks in seconds
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Age after which a pending batch is stale, in seconds
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Interval between stale batch checks in seconds
    #[serde(default = "default_stale_poll_secs")]
    pub stale_poll_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            tick_secs: default_tick_secs(),
            stale_after_secs: default_stale_after_secs(),
            stale_poll_secs: default_stale_poll_secs(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_tick_secs() -> u64 {
    60
}

fn default_stale_after_secs() -> u64 {
    3600
}

fn default_stale_poll_secs() -> u64 {
    10
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `SENDPACE_CONFIG` or the default locations
    pub fn load() -> crate::Result<Self> {
        if let Ok(path) = std::env::var("SENDPACE_CONFIG") {
            return Self::from_file(std::path::Path::new(&path));
        }

        let paths = [
            PathBuf::from("./sendpace.toml"),
            PathBuf::from("./config.toml"),
            PathBuf::from("/etc/sendpace/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }

    fn validate(&self) -> crate::Result<()> {
        if self.database.backend != "sqlite" {
            return Err(crate::Error::Config(format!(
                "Unsupported database backend: {}",
                self.database.backend
            )));
        }
        if self.scheduler.tick_secs == 0 || self.scheduler.stale_poll_secs == 0 {
            return Err(crate::Error::Config(
                "Scheduler intervals must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.log_capacity == 0 {
            return Err(crate::Error::Config(
                "dispatch.log_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let dispatch = DispatchConfig::default();
        assert_eq!(dispatch.min_delay_ms, 15_000);
        assert_eq!(dispatch.max_delay_ms, 30_000);
        assert_eq!(dispatch.failure_delay_ms, 5_000);

        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.tick_secs, 60);
        assert_eq!(scheduler.stale_after_secs, 3600);
        assert_eq!(scheduler.stale_poll_secs, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[database]
path = "/var/lib/sendpace/sendpace.db"

[messaging]
base_url = "http://bridge:3001"

[dispatch]
min_delay_ms = 20000

[scheduler]
enabled = false
"#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.database.backend, "sqlite");
        assert_eq!(config.messaging.base_url, "http://bridge:3001");
        assert_eq!(config.messaging.timeout_secs, 120);
        assert_eq!(config.dispatch.min_delay_ms, 20_000);
        assert_eq!(config.dispatch.max_delay_ms, 30_000);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let toml = r#"
[database]
backend = "postgres"
url = "postgres://localhost/sendpace"
"#;

        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_rejects_zero_tick() {
        let toml = r#"
[database]
url = "sqlite::memory:"

[scheduler]
tick_secs = 0
"#;

        assert!(Config::from_toml(toml).is_err());
    }
}
