//! Adapters between the engine and the two event sources.

use serde::Serialize;

use crate::correlation::CorrelationId;
use crate::engine::{CorrelationEngine, CorrelationError};
use crate::interceptor::{ExchangeFailure, ExchangeListener, InboundResponse, OutboundRequest, RawHeaders};
use crate::span::Span;

/// What the engine did with a finished span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanDisposition {
    /// Not a client span; outside the engine's concern.
    Ignored,
    /// Client span with no pending registration; export it normally.
    PassThrough,
    /// Export flag cleared; the engine will export a replacement.
    Suppressed,
}

/// Callbacks a tracer invokes around each outbound call.
pub trait SpanHooks: Send + Sync {
    /// Synchronous request hook, run before the call is dispatched.
    fn on_span_start(&self, span: &Span, headers: RawHeaders) -> Result<(), CorrelationError>;

    /// Span-end event. The tracer must skip export when `span.sampled` is false.
    fn on_span_end(&self, span: &mut Span) -> SpanDisposition;
}

impl SpanHooks for CorrelationEngine {
    fn on_span_start(&self, span: &Span, headers: RawHeaders) -> Result<(), CorrelationError> {
        CorrelationEngine::on_span_start(self, span, headers)
    }

    fn on_span_end(&self, span: &mut Span) -> SpanDisposition {
        CorrelationEngine::on_span_end(self, span)
    }
}

impl ExchangeListener for CorrelationEngine {
    fn on_request_sent(&self, id: &CorrelationId, request: &OutboundRequest) {
        CorrelationEngine::on_request_sent(self, id, request)
    }

    fn on_response_received(&self, id: &CorrelationId, response: InboundResponse) {
        CorrelationEngine::on_response_received(self, id, response)
    }

    fn on_request_failed(&self, id: &CorrelationId, failure: ExchangeFailure) {
        CorrelationEngine::on_request_failed(self, id, failure)
    }
}
