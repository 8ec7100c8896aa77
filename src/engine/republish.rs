//! Builds the replacement span exported in place of the original.

use crate::interceptor::{ExchangeFailure, ExchangeRecord};
use crate::span::{Span, SpanStatus};

pub const REQUEST_BODY: &str = "http.request.body";
pub const RESPONSE_BODY: &str = "http.response.body";
/// Response headers live under their own namespace so they never collide
/// with request header attributes.
pub const RESPONSE_HEADER_PREFIX: &str = "http.response.header.";

/// What the exchange side contributed by merge time.
#[derive(Debug, Clone, Copy)]
pub enum MergeSource<'a> {
    Exchange(&'a ExchangeRecord),
    Failure(&'a ExchangeFailure),
    /// The exchange never arrived or its state expired.
    Unavailable,
}

/// Build a new span from `original`, merging in whatever the exchange supplied.
///
/// Ids, name, kind, events and both timestamps are carried over unchanged,
/// so trace topology and measured duration are unaffected.
pub fn republish(original: &Span, source: MergeSource<'_>) -> Span {
    let mut attributes = original.attributes.clone();
    let mut status = original.status.clone();

    match source {
        MergeSource::Exchange(record) => {
            attributes.insert(REQUEST_BODY.to_string(), record.request_body.clone().into());
            attributes.insert(RESPONSE_BODY.to_string(), record.response_body.clone().into());
            for (name, value) in &record.response_headers {
                attributes.insert(
                    format!("{RESPONSE_HEADER_PREFIX}{}", name.to_ascii_lowercase()),
                    value.clone().into(),
                );
            }
        }
        MergeSource::Failure(failure) => {
            status = SpanStatus::Error {
                message: failure.message.clone(),
            };
        }
        MergeSource::Unavailable => {}
    }

    Span {
        span_id: original.span_id,
        trace_id: original.trace_id,
        name: original.name.clone(),
        kind: original.kind,
        attributes,
        status,
        events: original.events.clone(),
        start_time: original.start_time,
        end_time: original.end_time,
        sampled: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InboundResponse;
    use crate::span::{SpanId, SpanKind, TraceId};
    use serde_json::json;

    fn finished_span() -> Span {
        let mut span = Span::start(TraceId(7), SpanId(9), "GET", SpanKind::Client);
        span.set_attribute("http.method", "GET");
        span.add_event("dns.resolved");
        span.add_event("connected");
        span.end();
        span.sampled = false;
        span
    }

    #[test]
    fn test_merges_bodies_and_namespaced_headers() {
        let original = finished_span();
        let record = ExchangeRecord::new(
            r#"{"a":1}"#.into(),
            InboundResponse {
                status: 200,
                headers: vec![("Content-Type".into(), "application/json".into())],
                body: "ok".into(),
            },
        );

        let span = republish(&original, MergeSource::Exchange(&record));

        assert_eq!(span.attributes["http.method"], json!("GET"));
        assert_eq!(span.attributes[REQUEST_BODY], json!(r#"{"a":1}"#));
        assert_eq!(span.attributes[RESPONSE_BODY], json!("ok"));
        assert_eq!(
            span.attributes["http.response.header.content-type"],
            json!("application/json")
        );
        assert_eq!(span.status, SpanStatus::Unset);
    }

    #[test]
    fn test_preserves_identity_events_and_times() {
        let original = finished_span();
        let span = republish(&original, MergeSource::Unavailable);

        assert_eq!(span.span_id, original.span_id);
        assert_eq!(span.trace_id, original.trace_id);
        assert_eq!(span.events, original.events);
        assert_eq!(span.events[0].name, "dns.resolved");
        assert_eq!(span.start_time, original.start_time);
        assert_eq!(span.end_time, original.end_time);
        assert_eq!(span.attributes, original.attributes);
        assert!(span.sampled);
    }

    #[test]
    fn test_failure_overrides_status_without_bodies() {
        let original = finished_span();
        let failure = ExchangeFailure::new("timeout");

        let span = republish(&original, MergeSource::Failure(&failure));

        assert_eq!(span.status, SpanStatus::Error { message: "timeout".into() });
        assert!(!span.attributes.contains_key(REQUEST_BODY));
        assert!(!span.attributes.contains_key(RESPONSE_BODY));
    }
}
