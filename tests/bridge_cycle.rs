//! End-to-end request cycles through the bridge.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::json;
use stdio_bridge::app;
use stdio_bridge::config::{shared, BridgeConfig};
use stdio_bridge::http::StopReason;
use stdio_bridge::{Bridge, Shutdown};
use tokio::io::{AsyncWriteExt, BufReader};

mod common;

#[tokio::test]
async fn get_root_returns_hello_world() {
    let (result, output) =
        common::run_bridge(app::router(), BridgeConfig::default(), &common::record("GET", "/")).await;

    let summary = result.unwrap();
    assert_eq!(summary.served, 1);
    assert_eq!(summary.stop, StopReason::EndOfInput);

    let frames = common::parse_frames(&output);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, 200);
    assert_eq!(frames[0].reason, "OK");
    assert_eq!(frames[0].body_text(), "Hello, World!");
    assert_eq!(frames[0].header("content-length"), Some("13"));
    assert!(frames[0].header("x-request-id").is_some());
}

#[tokio::test]
async fn header_block_ends_with_exactly_one_blank_line() {
    let (result, output) =
        common::run_bridge(app::router(), BridgeConfig::default(), &common::record("GET", "/")).await;
    result.unwrap();

    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    assert!(!head.contains("\r\n\r\n"));
    assert!(!head.ends_with("\r\n"));
    assert_eq!(body, "Hello, World!");
}

#[tokio::test]
async fn serves_every_record_until_input_ends() {
    let input = [
        common::record("GET", "/"),
        common::record("GET", "/missing"),
        common::record("GET", "/"),
    ]
    .concat();

    let (result, output) = common::run_bridge(app::router(), BridgeConfig::default(), &input).await;
    let summary = result.unwrap();
    assert_eq!(summary.served, 3);

    let statuses: Vec<u16> = common::parse_frames(&output).iter().map(|f| f.status).collect();
    assert_eq!(statuses, vec![200, 404, 200]);
}

#[tokio::test]
async fn empty_input_stops_cleanly() {
    let (result, output) = common::run_bridge(app::router(), BridgeConfig::default(), "").await;
    let summary = result.unwrap();
    assert_eq!(summary.answered(), 0);
    assert_eq!(summary.stop, StopReason::EndOfInput);
    assert!(output.is_empty());
}

#[tokio::test]
async fn blank_and_malformed_lines_do_not_stop_the_loop() {
    let input = format!(
        "\n   \r\n{{garbage\n__import__('os').system('true')\n{}",
        common::record("GET", "/")
    );

    let (result, output) = common::run_bridge(app::router(), BridgeConfig::default(), &input).await;
    let summary = result.unwrap();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.served, 1);

    let frames = common::parse_frames(&output);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].status, 400);
    assert!(frames[0].body_text().contains("malformed request record"));
    assert_eq!(frames[1].status, 400);
    assert_eq!(frames[2].status, 200);
    assert_eq!(frames[2].body_text(), "Hello, World!");
}

#[tokio::test]
async fn record_without_trailing_newline_is_served() {
    let line = common::record("GET", "/");
    let (result, output) =
        common::run_bridge(app::router(), BridgeConfig::default(), line.trim_end()).await;
    assert_eq!(result.unwrap().served, 1);
    assert_eq!(common::parse_frames(&output)[0].status, 200);
}

#[tokio::test]
async fn oversized_record_gets_413_and_stream_stays_aligned() {
    let mut config = BridgeConfig::default();
    config.limits.max_record_bytes = 128;

    let big = common::record_with(json!({"REQUEST_METHOD": "POST"}), &"x".repeat(500));
    let input = format!("{big}{}", common::record("GET", "/"));

    let (result, output) = common::run_bridge(app::router(), config, &input).await;
    let summary = result.unwrap();
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.served, 1);

    let frames = common::parse_frames(&output);
    assert_eq!(frames[0].status, 413);
    assert_eq!(frames[1].status, 200);
}

#[tokio::test]
async fn unsupported_version_gets_505() {
    let input = format!(
        "{}\n",
        json!({"version": 7, "environ": {"REQUEST_METHOD": "GET"}})
    );
    let (result, output) = common::run_bridge(app::router(), BridgeConfig::default(), &input).await;
    result.unwrap();
    let frames = common::parse_frames(&output);
    assert_eq!(frames[0].status, 505);
    assert_eq!(frames[0].reason, "HTTP Version Not Supported");
}

#[tokio::test]
async fn request_limit_of_one_serves_once() {
    let mut config = BridgeConfig::default();
    config.runtime.max_requests = 1;

    let input = [common::record("GET", "/"), common::record("GET", "/")].concat();
    let (result, output) = common::run_bridge(app::router(), config, &input).await;

    let summary = result.unwrap();
    assert_eq!(summary.served, 1);
    assert_eq!(summary.stop, StopReason::RequestLimit);
    assert_eq!(common::parse_frames(&output).len(), 1);
}

#[tokio::test]
async fn rejected_records_count_toward_request_limit() {
    let mut config = BridgeConfig::default();
    config.runtime.max_requests = 2;

    let input = format!(
        "\n{{garbage\n{}{}",
        common::record("GET", "/"),
        common::record("GET", "/")
    );
    let (result, output) = common::run_bridge(app::router(), config, &input).await;

    let summary = result.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.served, 1);
    assert_eq!(summary.stop, StopReason::RequestLimit);

    let statuses: Vec<u16> = common::parse_frames(&output).iter().map(|f| f.status).collect();
    assert_eq!(statuses, vec![400, 200]);
}

#[tokio::test]
async fn post_body_and_headers_reach_the_application() {
    async fn echo(headers: HeaderMap, body: String) -> (StatusCode, [(header::HeaderName, String); 1], String) {
        let token = headers
            .get("x-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        (
            StatusCode::CREATED,
            [(header::HeaderName::from_static("x-seen-token"), token)],
            body.to_uppercase(),
        )
    }
    let router = Router::new().route("/echo", post(echo));

    let mut config = BridgeConfig::default();
    config.logging.log_payloads = true;

    let input = common::record_with(
        json!({
            "REQUEST_METHOD": "POST",
            "PATH_INFO": "/echo",
            "CONTENT_TYPE": "text/plain",
            "CONTENT_LENGTH": "5",
            "HTTP_X_TOKEN": "secret",
        }),
        "hello",
    );
    let (result, output) = common::run_bridge(router, config, &input).await;
    result.unwrap();

    let frame = &common::parse_frames(&output)[0];
    assert_eq!(frame.status, 201);
    assert_eq!(frame.header("x-seen-token"), Some("secret"));
    assert_eq!(frame.body_text(), "HELLO");
}

#[tokio::test]
async fn streamed_body_is_chunk_encoded() {
    let router = Router::new().route(
        "/stream",
        get(|| async {
            let parts = vec![
                Ok::<_, std::io::Error>("alpha,"),
                Ok("beta,"),
                Ok("gamma"),
            ];
            Body::from_stream(futures_util::stream::iter(parts))
        }),
    );
    let input = [common::record("GET", "/stream"), common::record("GET", "/stream")].concat();

    let (result, output) = common::run_bridge(router, BridgeConfig::default(), &input).await;
    assert_eq!(result.unwrap().served, 2);

    let frames = common::parse_frames(&output);
    assert_eq!(frames.len(), 2);
    for frame in frames {
        assert_eq!(frame.header("transfer-encoding"), Some("chunked"));
        assert_eq!(frame.header("content-length"), None);
        assert_eq!(frame.body_text(), "alpha,beta,gamma");
    }
}

#[tokio::test]
async fn head_request_writes_headers_only() {
    let input = [common::record("HEAD", "/"), common::record("GET", "/")].concat();
    let (result, output) = common::run_bridge(app::router(), BridgeConfig::default(), &input).await;
    assert_eq!(result.unwrap().served, 2);

    let text = String::from_utf8(output).unwrap();
    let (first_head, rest) = text.split_once("\r\n\r\n").unwrap();
    assert!(first_head.starts_with("HTTP/1.1 200 OK"));
    assert!(rest.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(rest.ends_with("\r\n\r\nHello, World!"));
}

#[tokio::test]
async fn host_request_id_is_echoed() {
    let input = common::record_with(
        json!({"REQUEST_METHOD": "GET", "PATH_INFO": "/", "HTTP_X_REQUEST_ID": "host-7"}),
        "",
    );
    let (result, output) = common::run_bridge(app::router(), BridgeConfig::default(), &input).await;
    result.unwrap();
    assert_eq!(common::parse_frames(&output)[0].header("x-request-id"), Some("host-7"));
}

#[tokio::test]
async fn shutdown_stops_an_idle_loop() {
    let bridge = Bridge::new(app::router(), shared(BridgeConfig::default()));
    let shutdown = Shutdown::new();
    let (mut host, bridge_side) = tokio::io::duplex(1024);
    let mut output = Vec::new();

    let run = bridge.run(BufReader::new(bridge_side), &mut output, shutdown.subscribe());
    let host_side = async {
        host.write_all(common::record("GET", "/").as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();
    };

    let (result, ()) = tokio::join!(run, host_side);
    let summary = result.unwrap();
    assert_eq!(summary.stop, StopReason::Shutdown);
    assert_eq!(summary.served, 1);

    drop(host);
    let frames = common::parse_frames(&output);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].body_text(), "Hello, World!");
}

#[tokio::test]
async fn dropped_shutdown_sender_keeps_partial_record_intact() {
    let bridge = Bridge::new(app::router(), shared(BridgeConfig::default()));
    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    let (mut host, bridge_side) = tokio::io::duplex(1024);
    let mut output = Vec::new();

    let line = common::record("GET", "/");
    let (head, tail) = line.split_at(line.len() / 2);

    let run = bridge.run(BufReader::new(bridge_side), &mut output, shutdown_rx);
    let host_side = async move {
        host.write_all(head.as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(shutdown);
        tokio::time::sleep(Duration::from_millis(50)).await;
        host.write_all(tail.as_bytes()).await.unwrap();
    };

    let (result, ()) = tokio::join!(run, host_side);
    let summary = result.unwrap();
    assert_eq!(summary.served, 1);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.stop, StopReason::EndOfInput);

    let frames = common::parse_frames(&output);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].body_text(), "Hello, World!");
}
