//! Export sinks for finished spans.

use std::sync::{Arc, Mutex, PoisonError};

use crate::span::model::Span;

/// Destination for spans the engine republishes.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: Span);
}

/// Keeps exported spans in memory.
///
/// Cloning shares the buffer, so a host can hand one clone to the engine and
/// read the other.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<Span>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything exported so far.
    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.spans.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: Span) {
        self.spans.lock().unwrap_or_else(PoisonError::into_inner).push(span);
    }
}

/// Writes each span as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExporter;

impl SpanExporter for LogExporter {
    fn export(&self, span: Span) {
        match serde_json::to_string(&span) {
            Ok(json) => tracing::info!(
                target: "egress_correlator::export",
                trace_id = %span.trace_id,
                span_id = %span.span_id,
                span = %json,
                "Span exported"
            ),
            Err(e) => tracing::error!(span_id = %span.span_id, error = %e, "Failed to encode span"),
        }
    }
}
