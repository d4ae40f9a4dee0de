//! HTTP request/response marshaling subsystem.
//!
//! # Data Flow
//! ```text
//! input line
//!     → environ.rs (decode JSON record, build Request)
//!     → request.rs (assign request ID)
//!     → server.rs (dispatch into the application Router)
//!     → response.rs (status line, headers, body framing)
//!     → output
//! ```

pub mod environ;
pub mod request;
pub mod response;
pub mod server;

pub use environ::{DecodeError, Environ, EnvironExtras, RequestRecord, UrlScheme, PROTOCOL_VERSION};
pub use request::{ensure_request_id, RequestId, RequestIdExt, X_REQUEST_ID};
pub use response::{BodyFraming, FramingError, ResponseWriter};
pub use server::{Bridge, CycleOutcome, RunSummary, StopReason};
