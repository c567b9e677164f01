//! Application configuration schema.
//!
//! This is the static, read-once configuration that tells the process who it
//! is and where the dynamic configuration lives. All types derive Serde traits
//! and default every field so minimal files stay valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration loaded once at startup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, the `{app}` segment of every storage key.
    pub name: String,

    /// Deployment environment, the `{env}` segment of every storage key.
    pub env: String,

    /// Remote store connection settings.
    #[serde(alias = "etcd")]
    pub store: StoreConfig,

    /// Logging settings.
    pub logger: LogConfig,

    /// Metrics settings.
    pub observability: ObservabilityConfig,
}

/// Remote store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Cluster endpoints (e.g., "http://127.0.0.1:2379").
    pub endpoints: Vec<String>,

    /// Optional authentication user.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Connection timeout in seconds.
    pub dial_timeout_secs: u64,

    /// Root prefix for every derived key (e.g., "/config").
    pub prefix: String,

    /// TLS file locations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

impl StoreConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            username: String::new(),
            password: String::new(),
            dial_timeout_secs: 5,
            prefix: "/config".to_string(),
            tls: None,
        }
    }
}

/// TLS file locations for the store connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Client certificate (PEM).
    pub cert_file: String,

    /// Client private key (PEM).
    pub key_file: String,

    /// CA bundle (PEM).
    #[serde(default)]
    pub ca_file: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter (trace, debug, info, warn, error).
    pub level: String,

    /// Output format: "text" or "json".
    pub format: String,

    /// Also write to daily-rotated files in `directory`.
    pub to_file: bool,

    pub directory: String,

    /// Development mode: include file/line and target in records.
    pub development: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            to_file: false,
            directory: "logs".to_string(),
            development: false,
        }
    }
}

/// Metrics exposition settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Scrape endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
