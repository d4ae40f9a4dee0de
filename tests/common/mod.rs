//! Shared utilities for bridge integration tests.

#![allow(dead_code)]

use axum::Router;
use serde_json::{json, Value};
use stdio_bridge::config::{shared, BridgeConfig};
use stdio_bridge::http::RunSummary;
use stdio_bridge::{Bridge, BridgeError, Shutdown};

/// A `bridge/1` record line for a bodyless request.
pub fn record(method: &str, path: &str) -> String {
    record_with(json!({"REQUEST_METHOD": method, "PATH_INFO": path}), "")
}

/// A `bridge/1` record line with an explicit environ and body.
pub fn record_with(environ: Value, body: &str) -> String {
    let mut line = json!({"version": 1, "environ": environ, "body": body}).to_string();
    line.push('\n');
    line
}

/// Run a bridge in front of `app` over `input` until the input ends.
pub async fn run_bridge(
    app: Router,
    config: BridgeConfig,
    input: &str,
) -> (Result<RunSummary, BridgeError>, Vec<u8>) {
    let bridge = Bridge::new(app, shared(config));
    let shutdown = Shutdown::new();
    let mut output = Vec::new();
    let result = bridge
        .run(input.as_bytes(), &mut output, shutdown.subscribe())
        .await;
    (result, output)
}

/// One response frame read back from the bridge output.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ParsedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Split bridge output into response frames.
///
/// Bodies are read per `content-length` or chunked coding; frames with
/// neither carry no body.
pub fn parse_frames(output: &[u8]) -> Vec<ParsedResponse> {
    let mut frames = Vec::new();
    let mut pos = 0;

    while pos < output.len() {
        let head_end = find(output, b"\r\n\r\n", pos).expect("unterminated header block");
        let head = std::str::from_utf8(&output[pos..head_end]).expect("non-UTF-8 header block");
        pos = head_end + 4;

        let mut lines = head.split("\r\n");
        let status_line = lines.next().expect("missing status line");
        let rest = status_line
            .strip_prefix("HTTP/1.1 ")
            .expect("status line must start with HTTP/1.1");
        let (code, reason) = rest.split_once(' ').expect("status line without reason");

        let headers: Vec<(String, String)> = lines
            .map(|line| {
                let (name, value) = line.split_once(": ").expect("malformed header line");
                (name.to_string(), value.to_string())
            })
            .collect();

        let mut response = ParsedResponse {
            status: code.parse().expect("numeric status"),
            reason: reason.to_string(),
            headers,
            body: Vec::new(),
        };

        if let Some(len) = response.header("content-length") {
            let len: usize = len.parse().expect("numeric content-length");
            response.body = output[pos..pos + len].to_vec();
            pos += len;
        } else if response.header("transfer-encoding") == Some("chunked") {
            loop {
                let size_end = find(output, b"\r\n", pos).expect("unterminated chunk size");
                let size = usize::from_str_radix(
                    std::str::from_utf8(&output[pos..size_end]).unwrap(),
                    16,
                )
                .expect("hex chunk size");
                pos = size_end + 2;
                if size == 0 {
                    assert_eq!(&output[pos..pos + 2], b"\r\n", "missing final CRLF");
                    pos += 2;
                    break;
                }
                response.body.extend_from_slice(&output[pos..pos + size]);
                pos += size;
                assert_eq!(&output[pos..pos + 2], b"\r\n", "chunk not CRLF terminated");
                pos += 2;
            }
        }

        frames.push(response);
    }

    frames
}
