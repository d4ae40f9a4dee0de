//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Read from stdin fails:
//!     → retries.rs (transient? retry : give up)
//!     → backoff.rs (how long to wait before the next attempt)
//!
//! Write to stdout fails:
//!     → retries.rs (disconnect? clean stop : fatal)
//! ```

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::{is_disconnect, is_transient};
