//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, ports numeric, delays ordered)
//! - Check names the subscriber and request builder will later parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::BridgeConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("limits.max_record_bytes must be greater than 0")]
    ZeroRecordLimit,

    #[error("timeouts.dispatch_secs must be greater than 0")]
    ZeroDispatchTimeout,

    #[error("retries.max_attempts must be at least 1")]
    ZeroRetryAttempts,

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    RetryDelayOrder { base: u64, max: u64 },

    #[error("logging.level '{0}' is not a known level")]
    UnknownLogLevel(String),

    #[error("environ.server_name must not be empty")]
    EmptyServerName,

    #[error("environ.server_port '{0}' is not a port number")]
    InvalidServerPort(String),

    #[error("environ.url_scheme '{0}' must be http or https")]
    UnsupportedScheme(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.limits.max_record_bytes == 0 {
        errors.push(ValidationError::ZeroRecordLimit);
    }

    if config.timeouts.dispatch_secs == 0 {
        errors.push(ValidationError::ZeroDispatchTimeout);
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroRetryAttempts);
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::RetryDelayOrder {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    if config.logging.level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::UnknownLogLevel(config.logging.level.clone()));
    }

    let environ = &config.environ;
    if environ.server_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServerName);
    }
    if environ.server_port.parse::<u16>().is_err() {
        errors.push(ValidationError::InvalidServerPort(environ.server_port.clone()));
    }
    if !matches!(environ.url_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::UnsupportedScheme(environ.url_scheme.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
