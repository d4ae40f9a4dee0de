//! Standard stream plumbing.
//!
//! # Data Flow
//! ```text
//! host process
//!     → stdin (one request record per line)
//!     → reader.rs (line split, size limit, transient retry)
//!     → http::environ (decode)
//! ```

pub mod reader;

pub use reader::{Frame, RecordReader};
