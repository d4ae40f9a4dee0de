//! stdio-bridge
//!
//! Serves the bundled application over standard streams.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                     STDIO BRIDGE                      │
//!                   │                                                       │
//!   host ──stdin────┼─▶ stdio::reader ──▶ http::environ ──▶ app Router     │
//!                   │                                           │           │
//!   host ◀─stdout───┼── http::response ◀────── http::server ◀───┘           │
//!                   │                                                       │
//!                   │  config · observability · resilience · lifecycle      │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::io::{BufReader, BufWriter};

use stdio_bridge::config::{shared, ConfigWatcher};
use stdio_bridge::lifecycle::{resolve_config, signals, Overrides};
use stdio_bridge::{app, observability, Bridge, Shutdown};

#[derive(Parser)]
#[command(name = "stdio-bridge")]
#[command(about = "Relay request records from stdin into a web application", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many answered requests (0 = until end of input).
    #[arg(long)]
    max_requests: Option<u64>,

    /// Append log events to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log payloads, parsed environs and response bodies at debug level.
    #[arg(long)]
    log_payloads: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("stdio-bridge: cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(run(cli));
    // a blocked stdin read must not hold the process open
    runtime.shutdown_timeout(Duration::from_millis(100));
    code
}

async fn run(cli: Cli) -> ExitCode {
    let overrides = Overrides {
        max_requests: cli.max_requests,
        log_file: cli.log_file,
        log_payloads: cli.log_payloads,
    };
    let config = match resolve_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("stdio-bridge: configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = observability::init(&config.logging) {
        eprintln!("stdio-bridge: {e}");
        return ExitCode::from(2);
    }

    tracing::info!("stdio-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        max_requests = config.runtime.max_requests,
        max_record_bytes = config.limits.max_record_bytes,
        dispatch_timeout_secs = config.timeouts.dispatch_secs,
        log_file = ?config.logging.file,
        "Configuration loaded"
    );

    let watch = config.runtime.watch_config;
    let shared_config = shared(config);

    let _watcher = match (&cli.config, watch) {
        (Some(path), true) => match ConfigWatcher::new(path, shared_config.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, continuing without reload");
                None
            }
        },
        _ => None,
    };

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    let bridge = Bridge::new(app::router(), shared_config);
    let input = BufReader::new(tokio::io::stdin());
    let output = BufWriter::new(tokio::io::stdout());

    match bridge.run(input, output, shutdown_rx).await {
        Ok(summary) => {
            tracing::info!(stop = ?summary.stop, "Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_disconnect() => {
            tracing::info!(error = %e, "Host closed the output stream");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Request loop failed");
            ExitCode::FAILURE
        }
    }
}
