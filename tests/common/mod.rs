//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use egress_correlator::config::EngineConfig;
use egress_correlator::interceptor::{InboundResponse, RawHeaders};
use egress_correlator::span::{InMemoryExporter, Span, SpanExporter, SpanId, SpanKind, TraceId};
use egress_correlator::{CorrelationEngine, SpanDisposition};

/// Fixed response served by [`start_mock_backend`].
#[derive(Clone)]
pub struct MockResponse {
    pub status: &'static str,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
}

/// Start a mock backend on an ephemeral port that answers every request
/// with `response` and then closes the connection.
pub async fn start_mock_backend(response: MockResponse) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    tokio::spawn(async move {
                        read_request(&mut socket).await;

                        let mut response_str = format!("HTTP/1.1 {}\r\n", response.status);
                        for (name, value) in &response.headers {
                            response_str.push_str(&format!("{name}: {value}\r\n"));
                        }
                        response_str.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.body.len(),
                            response.body
                        ));
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Consume one request (head plus `Content-Length` body) so closing the
/// socket does not reset the connection under the client.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Minimal host tracing pipeline around one engine.
///
/// Spans the engine lets through are exported into the same in-memory
/// exporter the engine republishes into, so `exported()` is everything a
/// backend would receive.
pub struct Host {
    pub engine: Arc<CorrelationEngine>,
    pub exporter: Arc<InMemoryExporter>,
    next_span: AtomicU64,
}

impl Host {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let exporter = Arc::new(InMemoryExporter::new());
        let engine = CorrelationEngine::new(&config, exporter.clone()).unwrap();
        Self {
            engine: Arc::new(engine),
            exporter,
            next_span: AtomicU64::new(1),
        }
    }

    /// Start a client span for a call tagged with `id` and run the request hook.
    pub fn start_span(&self, id: &str) -> Span {
        let span = self.client_span();
        let headers = format!("x-correlation-id: {id}\r\naccept: application/json");
        self.engine
            .on_span_start(&span, RawHeaders::from(headers.as_str()))
            .unwrap();
        span
    }

    pub fn client_span(&self) -> Span {
        let span_id = SpanId(self.next_span.fetch_add(1, Ordering::Relaxed));
        let mut span = Span::start(TraceId(0xabc), span_id, "GET", SpanKind::Client);
        span.set_attribute("http.method", "GET");
        span
    }

    /// End `span`, report it to the engine and export it unless suppressed.
    pub fn end_span(&self, mut span: Span) -> SpanDisposition {
        span.end();
        let disposition = self.engine.on_span_end(&mut span);
        if span.sampled {
            self.exporter.export(span);
        }
        disposition
    }

    /// Wait for every live merge task to settle.
    pub async fn settle(&self) {
        self.engine.force_flush(Duration::from_secs(5)).await;
    }

    pub fn exported(&self) -> Vec<Span> {
        self.exporter.spans()
    }
}

pub fn json_response(body: &str) -> InboundResponse {
    InboundResponse {
        status: 200,
        headers: vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Request-Id".to_string(), "req-1".to_string()),
        ],
        body: body.to_string(),
    }
}
