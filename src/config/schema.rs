//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Request loop settings.
    pub runtime: RuntimeConfig,

    /// Input size limits.
    pub limits: LimitsConfig,

    /// Defaults for environ keys the host leaves out.
    pub environ: EnvironDefaults,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for transient input errors.
    pub retries: RetryConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Request loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Stop after this many answered records, served or rejected (0 = until end of input).
    pub max_requests: u64,

    /// Reload the config file when it changes on disk.
    pub watch_config: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_requests: 0,
            watch_config: false,
        }
    }
}

/// Input size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of one request record line in bytes.
    pub max_record_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_record_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Values used when a request record omits server identity keys.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EnvironDefaults {
    /// Fallback for `SERVER_NAME`.
    pub server_name: String,

    /// Fallback for `SERVER_PORT`.
    pub server_port: String,

    /// Fallback for `wsgi.url_scheme`.
    pub url_scheme: String,
}

impl Default for EnvironDefaults {
    fn default() -> Self {
        Self {
            server_name: "SWGI-Server".to_string(),
            server_port: "8100".to_string(),
            url_scheme: "http".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time the application may take to produce response headers, in seconds.
    pub dispatch_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { dispatch_secs: 30 }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts for one read (1 = no retry).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 500,
        }
    }
}

/// Output format for log events.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub level: String,

    /// Event format.
    pub format: LogFormat,

    /// Append events to this file in addition to stderr.
    pub file: Option<PathBuf>,

    /// Log raw payloads, parsed environs and response bodies at debug level.
    pub log_payloads: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
            log_payloads: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [runtime]
            max_requests = 1

            [logging]
            format = "json"
            file = "/tmp/bridge.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.runtime.max_requests, 1);
        assert!(!config.runtime.watch_config);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/bridge.log")));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.environ.server_port, "8100");
    }
}
