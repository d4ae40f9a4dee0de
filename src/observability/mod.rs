//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events and spans (request ID, cycle sequence number)
//!     → logging.rs subscriber
//!
//! Consumers:
//!     → stderr (the host's diagnostic channel)
//!     → optional append-only log file
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted messages
//! - Request ID flows through every event of a request cycle
//! - Payload logging is opt-in: it writes request and response bodies

pub mod logging;

pub use logging::{init, LoggingError};
