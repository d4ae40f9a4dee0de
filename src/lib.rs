//! Standard stream bridge for axum applications.
//!
//! Reads one JSON request record per line from an input stream, dispatches
//! it into a `Router`, and writes the response back as an HTTP/1.1 frame.

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod stdio;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use http::Bridge;
pub use lifecycle::Shutdown;
