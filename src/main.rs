//! Traced calculator web service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request         ┌───────────────────────────────────────────────────┐
//!     ───────────────────────┼─▶ http (axum router, request id, timeout, trace) │
//!                            │        │                                          │
//!                            │        ▼                                          │
//!                            │   Instrumented<Handler>  ── opens span ──┐        │
//!                            │        │                                 │        │
//!                            │        ▼                                 ▼        │
//!                            │   calculator handler            Tracer → SpanSink │
//!                            │        │                                 ▲        │
//!                            │        ▼                                 │        │
//!     Client Response        │   Result / CalcError  ── closes span ────┘        │
//!     ◀──────────────────────┼── response (JSON, errors → 400)                   │
//!                            └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use calculator_app::config::load_config;
use calculator_app::http::HttpServer;
use calculator_app::lifecycle::{signals, startup};
use calculator_app::observability::{logging, metrics, Tracer};

#[derive(Parser)]
#[command(name = "calculator-app")]
#[command(about = "Arithmetic over HTTP with per-operation tracing", long_about = None)]
struct Args {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!("calculator-app v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        simulation = config.simulation.enabled,
        service = %config.tracing.service,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let tracer = Tracer::from_config(&config.tracing);
    let bind_address = config.listener.bind_address();
    let grace = config.timeouts.shutdown();

    let server = HttpServer::new(config, tracer.clone());
    let running = startup::start(server, &bind_address).await?;

    signals::wait_for_signal().await;
    running.stop(grace).await?;

    let stats = tracer.stats();
    tracing::info!(
        spans_opened = stats.opened,
        spans_closed = stats.closed,
        "Shutdown complete"
    );
    Ok(())
}
