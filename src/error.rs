//! Bridge error taxonomy.
//!
//! Only errors that end the request loop live here. Decoder failures and
//! application failures are answered with an error response instead and never
//! reach this type.

use std::io;

use thiserror::Error;

use crate::http::response::FramingError;
use crate::resilience::is_disconnect;

/// Fatal errors returned by [`crate::Bridge::run`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Reading from the host failed and retries, if any, were exhausted.
    #[error("input error: {0}")]
    Input(#[source] io::Error),

    /// Writing to the host failed.
    #[error("output error: {0}")]
    Output(#[source] io::Error),

    /// A response frame could not be completed; the output is out of sync.
    #[error("framing error: {0}")]
    Framing(FramingError),
}

impl BridgeError {
    /// Returns true if the host closed its end of the output stream.
    ///
    /// The binary treats this as a clean stop.
    pub fn is_disconnect(&self) -> bool {
        match self {
            BridgeError::Output(e) => is_disconnect(e),
            _ => false,
        }
    }
}

impl From<FramingError> for BridgeError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::Io(e) => BridgeError::Output(e),
            other => BridgeError::Framing(other),
        }
    }
}
