//! The request loop.
//!
//! # Responsibilities
//! - Wrap the application with panic catching, dispatch timeout and tracing
//! - Read one request record per cycle and decode it
//! - Dispatch the request into the application's `Router`
//! - Frame the response (headers, then body chunks) onto the output
//! - Stop on end of input, request limit, or shutdown signal
//!
//! # Design Decisions
//! - Strictly sequential: read, then dispatch, then write
//! - Undecodable input and failing handlers are answered, not fatal
//! - Shutdown is only observed between cycles; a started cycle completes

use std::time::{Duration, Instant};

use axum::{
    body::{Body, HttpBody},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::StreamExt;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::broadcast::{self, error::RecvError};
use tower::ServiceExt;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::config::SharedConfig;
use crate::error::BridgeError;
use crate::http::environ::{DecodeError, RequestRecord};
use crate::http::request::{ensure_request_id, RequestId, X_REQUEST_ID};
use crate::http::response::{BodyFraming, ResponseWriter};
use crate::stdio::{Frame, RecordReader};

/// Why the request loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The host closed the input stream.
    #[default]
    EndOfInput,
    /// `runtime.max_requests` records were answered.
    RequestLimit,
    /// A shutdown signal arrived while waiting for input.
    Shutdown,
}

/// What one cycle did with its input frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Dispatched to the application and answered.
    Served,
    /// Answered with an error response without reaching the application.
    Rejected,
    /// Blank line, nothing written.
    Skipped,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub served: u64,
    pub rejected: u64,
    pub skipped: u64,
    pub stop: StopReason,
}

impl RunSummary {
    /// Cycles that produced a response.
    pub fn answered(&self) -> u64 {
        self.served + self.rejected
    }
}

/// Relays request records from an input stream into an application.
pub struct Bridge {
    app: Router,
    config: SharedConfig,
}

impl Bridge {
    /// Create a bridge in front of `app`.
    ///
    /// The dispatch timeout is read from `config` once, here.
    pub fn new(app: Router, config: SharedConfig) -> Self {
        let timeout = Duration::from_secs(config.load().timeouts.dispatch_secs);
        Self {
            app: Self::wrap_app(app, timeout),
            config,
        }
    }

    /// Wrap the application with the bridge's middleware layers.
    #[allow(deprecated)]
    fn wrap_app(app: Router, timeout: Duration) -> Router {
        app.layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve request records from `input` until it ends, the request limit is
    /// reached, or `shutdown` fires.
    pub async fn run<R, W>(
        &self,
        input: R,
        mut output: W,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary, BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = RecordReader::new(input);
        let mut summary = RunSummary::default();
        let mut shutdown_open = true;
        let mut seq = 0u64;

        tracing::info!("Request loop started");

        loop {
            let config = self.config.load_full();
            let max_requests = config.runtime.max_requests;
            if max_requests > 0 && summary.answered() >= max_requests {
                summary.stop = StopReason::RequestLimit;
                break;
            }

            // the read future is not cancel-safe; it must survive a closed shutdown channel
            let next = reader.next_frame(config.limits.max_record_bytes, &config.retries);
            tokio::pin!(next);
            let read = loop {
                tokio::select! {
                    biased;
                    signal = shutdown.recv(), if shutdown_open => match signal {
                        Err(RecvError::Closed) => shutdown_open = false,
                        Ok(()) | Err(RecvError::Lagged(_)) => break None,
                    },
                    frame = &mut next => break Some(frame.map_err(BridgeError::Input)?),
                }
            };

            let Some(frame) = read else {
                tracing::info!("Shutdown signal received, stopping request loop");
                summary.stop = StopReason::Shutdown;
                break;
            };
            let Some(frame) = frame else {
                summary.stop = StopReason::EndOfInput;
                break;
            };

            seq += 1;
            match self.serve_frame(seq, frame, &mut output).await? {
                CycleOutcome::Served => summary.served += 1,
                CycleOutcome::Rejected => summary.rejected += 1,
                CycleOutcome::Skipped => summary.skipped += 1,
            }
        }

        tracing::info!(
            served = summary.served,
            rejected = summary.rejected,
            skipped = summary.skipped,
            stop = ?summary.stop,
            "Request loop stopped"
        );
        Ok(summary)
    }

    /// Serve one request cycle for an input frame.
    pub async fn serve_frame<W>(
        &self,
        seq: u64,
        frame: Frame,
        output: &mut W,
    ) -> Result<CycleOutcome, BridgeError>
    where
        W: AsyncWrite + Unpin,
    {
        let config = self.config.load_full();
        let log_payloads = config.logging.log_payloads;

        let bytes = match frame {
            Frame::Record(bytes) => bytes,
            Frame::Oversized { limit, discarded } => {
                tracing::debug!(seq, discarded, "Oversized record discarded");
                self.reject(seq, DecodeError::TooLarge { limit }, output, log_payloads)
                    .await?;
                return Ok(CycleOutcome::Rejected);
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(seq, "Skipping blank input line");
            return Ok(CycleOutcome::Skipped);
        }
        if log_payloads {
            tracing::debug!(seq, payload = %String::from_utf8_lossy(&bytes), "Request payload");
        }

        let decoded = RequestRecord::from_slice(&bytes).and_then(|record| {
            if log_payloads {
                tracing::debug!(seq, environ = ?record.environ, "Parsed environ");
            }
            record.into_request(&config.environ)
        });
        let mut request = match decoded {
            Ok(request) => request,
            Err(err) => {
                self.reject(seq, err, output, log_payloads).await?;
                return Ok(CycleOutcome::Rejected);
            }
        };

        let request_id = ensure_request_id(&mut request);
        let method = request.method().clone();
        let span = tracing::info_span!(
            "cycle",
            seq,
            request_id = %request_id,
            method = %method,
            path = %request.uri().path()
        );

        async move {
            let started = Instant::now();
            let response = match self.app.clone().oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            let status = response.status();

            write_response(output, response, &request_id, method == Method::HEAD, log_payloads)
                .await?;

            tracing::info!(
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request served"
            );
            Ok::<_, BridgeError>(CycleOutcome::Served)
        }
        .instrument(span)
        .await
    }

    async fn reject<W>(
        &self,
        seq: u64,
        err: DecodeError,
        output: &mut W,
        log_payloads: bool,
    ) -> Result<(), BridgeError>
    where
        W: AsyncWrite + Unpin,
    {
        let request_id = RequestId::new();
        tracing::warn!(
            seq,
            request_id = %request_id,
            status = err.status().as_u16(),
            error = %err,
            "Rejecting request record"
        );
        write_response(output, err.into_response(), &request_id, false, log_payloads).await
    }
}

/// Pick the body delimitation for a response.
fn body_framing(status: StatusCode, body: &Body, head_only: bool) -> BodyFraming {
    if head_only
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return BodyFraming::None;
    }
    // a streamed body may not match the content-length its handler declared
    match body.size_hint().exact() {
        Some(len) => BodyFraming::Length(len),
        None => BodyFraming::Chunked,
    }
}

/// Write `response` as one frame: headers first, then the body chunk by chunk.
async fn write_response<W>(
    output: &mut W,
    response: Response,
    request_id: &RequestId,
    head_only: bool,
    log_payloads: bool,
) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    let (mut parts, body) = response.into_parts();
    parts.headers.insert(X_REQUEST_ID, request_id.header_value());

    let framing = body_framing(parts.status, &body, head_only);
    let mut writer = ResponseWriter::new(output);
    writer.start(parts.status, &parts.headers, framing).await?;

    if framing != BodyFraming::None {
        let mut stream = body.into_data_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if log_payloads {
                        tracing::debug!(
                            len = bytes.len(),
                            chunk = %String::from_utf8_lossy(&bytes),
                            "Response body chunk"
                        );
                    }
                    writer.write_chunk(&bytes).await?;
                }
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        written = writer.body_written(),
                        "Response body failed mid-stream"
                    );
                    break;
                }
            }
        }
    }

    writer.finish().await?;
    Ok(())
}
