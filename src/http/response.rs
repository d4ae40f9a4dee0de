//! Response framing.
//!
//! # Responsibilities
//! - Write the status line and header block (the response-starting callback)
//! - Stream body chunks to the output as they are produced
//! - Delimit the body so the host can find the next response
//!
//! # Wire Format
//! ```text
//! HTTP/1.1 <code> <reason>\r\n
//! <name>: <value>\r\n
//! \r\n
//! <body: exactly content-length bytes, or chunked transfer coding>
//! ```
//!
//! # Design Decisions
//! - Exactly one blank line ends the header block
//! - The writer owns body delimitation: framework framing headers are replaced
//! - Headers and body are each flushed as soon as they are complete
//! - Misuse (double start, body before start) is an error, never silently fixed

use std::io;

use axum::http::{header, HeaderMap, StatusCode};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// How the body following the header block is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body follows; headers are written exactly as given.
    None,
    /// `content-length` bytes follow.
    Length(u64),
    /// Chunked transfer coding follows.
    Chunked,
}

/// Protocol misuse or output failure while writing a response.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("response already started")]
    AlreadyStarted,

    #[error("body written before the response was started")]
    NotStarted,

    #[error("response already finished")]
    Finished,

    #[error("response carries no body")]
    BodyNotAllowed,

    #[error("body exceeds declared length of {declared} bytes")]
    LengthExceeded { declared: u64 },

    #[error("body ended after {written} of {declared} declared bytes")]
    LengthShort { declared: u64, written: u64 },

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
enum State {
    Idle,
    Streaming { framing: BodyFraming, written: u64 },
    Finished,
}

/// Writes one response frame to the output.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    out: W,
    state: State,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: State::Idle,
        }
    }

    /// Returns true once the header block has been written.
    pub fn is_started(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// Body bytes written so far.
    pub fn body_written(&self) -> u64 {
        match self.state {
            State::Streaming { written, .. } => written,
            _ => 0,
        }
    }

    /// Start the response: status line, headers, blank line, flush.
    ///
    /// May be called once per response.
    pub async fn start(
        &mut self,
        status: StatusCode,
        headers: &HeaderMap,
        framing: BodyFraming,
    ) -> Result<(), FramingError> {
        if self.is_started() {
            return Err(FramingError::AlreadyStarted);
        }

        let mut head = Vec::with_capacity(256);
        head.extend_from_slice(
            format!(
                "HTTP/1.1 {} {}\r\n",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .as_bytes(),
        );

        for (name, value) in headers {
            let framing_header =
                *name == header::CONTENT_LENGTH || *name == header::TRANSFER_ENCODING;
            if framing_header && framing != BodyFraming::None {
                continue;
            }
            head.extend_from_slice(name.as_str().as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }

        match framing {
            BodyFraming::Length(len) => {
                head.extend_from_slice(format!("content-length: {len}\r\n").as_bytes())
            }
            BodyFraming::Chunked => head.extend_from_slice(b"transfer-encoding: chunked\r\n"),
            BodyFraming::None => {}
        }
        head.extend_from_slice(b"\r\n");

        self.out.write_all(&head).await?;
        self.out.flush().await?;
        self.state = State::Streaming { framing, written: 0 };
        Ok(())
    }

    /// Write one body chunk straight through to the output.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), FramingError> {
        let (framing, written) = match &mut self.state {
            State::Idle => return Err(FramingError::NotStarted),
            State::Finished => return Err(FramingError::Finished),
            State::Streaming { framing, written } => (*framing, written),
        };
        if chunk.is_empty() {
            return Ok(());
        }
        let len = chunk.len() as u64;

        match framing {
            BodyFraming::None => return Err(FramingError::BodyNotAllowed),
            BodyFraming::Length(declared) => {
                if *written + len > declared {
                    return Err(FramingError::LengthExceeded { declared });
                }
                self.out.write_all(chunk).await?;
            }
            BodyFraming::Chunked => {
                self.out
                    .write_all(format!("{:X}\r\n", chunk.len()).as_bytes())
                    .await?;
                self.out.write_all(chunk).await?;
                self.out.write_all(b"\r\n").await?;
            }
        }
        *written += len;
        Ok(())
    }

    /// End the body and flush.
    pub async fn finish(&mut self) -> Result<(), FramingError> {
        let (framing, written) = match self.state {
            State::Idle => return Err(FramingError::NotStarted),
            State::Finished => return Err(FramingError::Finished),
            State::Streaming { framing, written } => (framing, written),
        };
        self.state = State::Finished;

        match framing {
            BodyFraming::Length(declared) if written < declared => {
                self.out.flush().await?;
                return Err(FramingError::LengthShort { declared, written });
            }
            BodyFraming::Chunked => self.out.write_all(b"0\r\n\r\n").await?,
            _ => {}
        }
        self.out.flush().await?;
        Ok(())
    }
}
