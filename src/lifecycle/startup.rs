//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration from file or defaults
//! - Apply command-line overrides
//! - Validate the final configuration
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Overrides are validated together with the file they override

use std::path::{Path, PathBuf};

use crate::config::{load_config, validate_config, BridgeConfig, ConfigError};

/// Command-line settings that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_requests: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub log_payloads: bool,
}

/// Load the config at `path` (or defaults) and apply `overrides`.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<BridgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    if let Some(max_requests) = overrides.max_requests {
        config.runtime.max_requests = max_requests;
    }
    if let Some(log_file) = &overrides.log_file {
        config.logging.file = Some(log_file.clone());
    }
    if overrides.log_payloads {
        config.logging.log_payloads = true;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
