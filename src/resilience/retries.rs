//! Retry logic for the input stream.
//!
//! # Responsibilities
//! - Classify I/O errors as transient or fatal
//! - Classify output errors that mean the host went away
//!
//! # Design Decisions
//! - Only interruption-style errors are retried; everything else ends the loop
//! - Output is never retried: a partial frame cannot be resent safely

use std::io;

/// Returns true if a read failing with `err` may succeed when repeated.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Returns true if `err` means the peer closed its end of the stream.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}
