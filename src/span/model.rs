//! Span types shared between the host tracer and the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Span identifier (8 bytes, as in W3C trace context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanId(pub u64);

impl From<u64> for SpanId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Trace identifier (16 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(pub u128);

impl From<u128> for TraceId {
    fn from(id: u128) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Role of the span in the call it records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

/// Final status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "code")]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error { message: String },
}

/// A timestamped event recorded on a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: SystemTime,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

/// A timed record of one traced operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub span_id: SpanId,
    pub trace_id: TraceId,
    pub name: String,
    pub kind: SpanKind,
    pub attributes: HashMap<String, serde_json::Value>,
    pub status: SpanStatus,
    pub events: Vec<SpanEvent>,
    pub start_time: SystemTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<SystemTime>,
    /// Export flag. Cleared when the engine takes over the span.
    pub sampled: bool,
}

impl Span {
    /// Start a new sampled span.
    pub fn start(
        trace_id: TraceId,
        span_id: SpanId,
        name: impl Into<String>,
        kind: SpanKind,
    ) -> Self {
        Self {
            span_id,
            trace_id,
            name: name.into(),
            kind,
            attributes: HashMap::new(),
            status: SpanStatus::Unset,
            events: Vec::new(),
            start_time: SystemTime::now(),
            end_time: None,
            sampled: true,
        }
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Record an event at the current time.
    pub fn add_event(&mut self, name: impl Into<String>) {
        self.events.push(SpanEvent {
            name: name.into(),
            timestamp: SystemTime::now(),
            attributes: HashMap::new(),
        });
    }

    /// End the span at the current time. Ending twice keeps the first timestamp.
    pub fn end(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(SystemTime::now());
        }
    }

    pub fn is_client(&self) -> bool {
        self.kind == SpanKind::Client
    }

    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_fixed_width_hex() {
        assert_eq!(SpanId(0xab).to_string(), "00000000000000ab");
        assert_eq!(TraceId(1).to_string().len(), 32);
    }

    #[test]
    fn test_end_keeps_first_timestamp() {
        let mut span = Span::start(TraceId(1), SpanId(2), "GET", SpanKind::Client);
        span.end();
        let first = span.end_time;
        std::thread::sleep(std::time::Duration::from_millis(2));
        span.end();
        assert_eq!(span.end_time, first);
        assert!(span.is_ended());
    }

    #[test]
    fn test_status_serializes_with_code_tag() {
        let status = SpanStatus::Error { message: "timeout".into() };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"code": "error", "message": "timeout"}));
    }
}
