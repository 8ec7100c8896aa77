//! Egress correlator CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   fetch <url>...                          serve
//!       │                                     │
//!       ▼                                     ▼
//!   ┌──────────────┐   request hook    ┌──────────────┐
//!   │ host pipeline│──────────────────▶│  correlation │◀──── /admin/* (diagnostics)
//!   │ (client span)│   span end        │    engine    │
//!   └──────┬───────┘──────────────────▶└──────┬───────┘
//!          │                                  │ replacement span
//!          ▼                                  ▼
//!   ┌──────────────┐  exchange events  ┌──────────────┐
//!   │ intercepting │──────────────────▶│ LogExporter  │
//!   │    client    │                   └──────────────┘
//!   └──────────────┘
//! ```

use axum::body::Body;
use axum::http::Request;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use egress_correlator::admin::setup_admin_router;
use egress_correlator::config::{load_config, CorrelatorConfig};
use egress_correlator::interceptor::{InterceptingClient, RawHeaders};
use egress_correlator::lifecycle::signals;
use egress_correlator::observability::{logging, metrics};
use egress_correlator::span::{LogExporter, Span, SpanExporter, SpanId, SpanKind, SpanStatus, TraceId};
use egress_correlator::CorrelationEngine;

#[derive(Parser)]
#[command(name = "egress-correlator")]
#[command(about = "Enrich outbound HTTP client spans with their payloads", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Expose Prometheus metrics regardless of the config file.
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET each URL through the interceptor and export the enriched spans
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Run the diagnostics endpoints until Ctrl+C
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CorrelatorConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "egress-correlator starting");

    if cli.metrics || config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let exporter: Arc<dyn SpanExporter> = Arc::new(LogExporter);
    let engine = Arc::new(CorrelationEngine::new(&config.engine, exporter.clone())?);

    match cli.command {
        Commands::Fetch { urls } => {
            let client = InterceptingClient::new(
                &config.interceptor,
                engine.correlation_header(),
                engine.clone(),
            )?;
            for url in &urls {
                fetch(&engine, &client, exporter.as_ref(), url).await;
            }
        }
        Commands::Serve if config.admin.enabled => {
            let listener = TcpListener::bind(&config.admin.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Diagnostics listening");

            axum::serve(listener, setup_admin_router(engine.clone()))
                .with_graceful_shutdown(signals::ctrl_c())
                .await?;
        }
        Commands::Serve => {
            tracing::info!("Diagnostics disabled, waiting for Ctrl+C");
            signals::ctrl_c().await;
        }
    }

    let outcome = engine.shutdown().await;
    tracing::info!(?outcome, "Shutdown complete");
    Ok(())
}

/// One traced GET: the minimal host pipeline around the interceptor.
async fn fetch(engine: &CorrelationEngine, client: &InterceptingClient, exporter: &dyn SpanExporter, url: &str) {
    let mut request = match Request::get(url).body(Body::empty()) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(url, error = %e, "Invalid URL");
            return;
        }
    };
    if let Err(e) = client.tag(&mut request) {
        tracing::error!(url, error = %e, "Failed to tag request");
        return;
    }

    let trace_id = TraceId(uuid::Uuid::new_v4().as_u128());
    let mut span = Span::start(trace_id, SpanId(fastrand::u64(1..)), "GET", SpanKind::Client);
    span.set_attribute("http.request.method", "GET");
    span.set_attribute("url.full", url);

    if let Err(e) = engine.on_span_start(&span, RawHeaders::from(request.headers())) {
        tracing::warn!(url, error = %e, "Call not registered for correlation");
    }

    match client.send(request).await {
        Ok(response) => {
            span.set_attribute("http.response.status_code", response.status().as_u16());
            println!("{url}: {}", response.status());
        }
        Err(e) => {
            span.status = SpanStatus::Error { message: e.to_string() };
            println!("{url}: {e}");
        }
    }

    span.end();
    engine.on_span_end(&mut span);
    if span.sampled {
        exporter.export(span);
    }
}
