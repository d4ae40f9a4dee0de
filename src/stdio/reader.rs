//! Line-oriented request record reader.
//!
//! # Responsibilities
//! - Split the input stream into one record per line
//! - Enforce the record size limit without losing stream alignment
//! - Retry transient read failures with backoff

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::RetryConfig;
use crate::resilience::{calculate_backoff, is_transient};

/// One unit of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, terminator stripped.
    Record(Vec<u8>),
    /// A line longer than the limit. Its bytes were consumed and dropped.
    Oversized { limit: usize, discarded: usize },
}

/// Reads [`Frame`]s from a buffered input stream.
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
}

impl<R> RecordReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next line, or `None` once the input is exhausted.
    ///
    /// A final line without a terminator is still returned as a record.
    pub async fn next_frame(
        &mut self,
        limit: usize,
        retry: &RetryConfig,
    ) -> io::Result<Option<Frame>> {
        let mut line = Vec::new();
        let mut discarded = 0usize;
        let mut oversized = false;
        let mut seen_any = false;
        let mut attempt = 0u32;

        loop {
            let available = match self.inner.fill_buf().await {
                Ok(buf) => buf,
                Err(e) if is_transient(&e) && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    let delay = calculate_backoff(attempt, retry);
                    tracing::warn!(error = %e, attempt, delay = ?delay, "Transient input error, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            attempt = 0;

            if available.is_empty() {
                if !seen_any {
                    return Ok(None);
                }
                break;
            }
            seen_any = true;

            let newline = available.iter().position(|&b| b == b'\n');
            let content = match newline {
                Some(i) => &available[..i],
                None => available,
            };

            if oversized {
                discarded += content.len();
            } else if line.len() + content.len() > limit.saturating_add(1) {
                oversized = true;
                discarded = line.len() + content.len();
                line = Vec::new();
            } else {
                line.extend_from_slice(content);
            }

            let used = newline.map_or(available.len(), |i| i + 1);
            self.inner.consume(used);

            if newline.is_some() {
                break;
            }
        }

        if oversized {
            return Ok(Some(Frame::Oversized { limit, discarded }));
        }
        let received = line.len();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        // the limit applies to the record without its terminator
        if line.len() > limit {
            return Ok(Some(Frame::Oversized {
                limit,
                discarded: received,
            }));
        }
        Ok(Some(Frame::Record(line)))
    }
}
