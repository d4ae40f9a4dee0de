//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig (validated, immutable)
//!     → shared via Arc<ArcSwap<_>> with the bridge loop
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the shared BridgeConfig
//!     → next request cycle observes new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Router layers and the log subscriber are built once at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BridgeConfig, EnvironDefaults, LimitsConfig, LogFormat, LoggingConfig, RetryConfig,
    RuntimeConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{shared, ConfigWatcher, SharedConfig};
