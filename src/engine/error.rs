//! Engine error definitions.

use thiserror::Error;

use crate::correlation::CorrelationId;
use crate::span::SpanId;

/// Fatal, synchronous request-hook failures. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The outgoing headers carry no correlation id: the instrumentation
    /// chain is miswired upstream.
    #[error("outgoing request has no {header} header")]
    MissingCorrelationId { header: String },

    /// A registration arrived for an id that is still pending.
    #[error("correlation id {correlation_id} is already registered")]
    DuplicateRegistration { correlation_id: CorrelationId },

    /// A registration arrived for a span that is already awaited.
    #[error("span {span_id} is already registered")]
    DuplicateSpan { span_id: SpanId },

    /// The engine was built outside a tokio runtime.
    #[error("correlation engine requires a tokio runtime")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CorrelationError::DuplicateRegistration {
            correlation_id: CorrelationId::from("r3"),
        };
        assert_eq!(err.to_string(), "correlation id r3 is already registered");

        let err = CorrelationError::MissingCorrelationId {
            header: "x-correlation-id".into(),
        };
        assert!(err.to_string().contains("x-correlation-id"));
    }
}
