//! Exchange events and the listener that consumes them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::correlation::CorrelationId;
use crate::interceptor::headers::HeaderList;

/// An outbound request as seen at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub headers: HeaderList,
    pub body: String,
}

impl OutboundRequest {
    /// Host part of the request URL, if it parses.
    pub fn hostname(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()?
            .host_str()
            .map(str::to_string)
    }
}

/// A fully materialized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    pub status: u16,
    pub headers: HeaderList,
    pub body: String,
}

/// Transport-level failure of an outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeFailure {
    pub message: String,
}

impl ExchangeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// What a resolved exchange contributes to its span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub request_body: String,
    pub response_body: String,
    /// Lower-cased names; repeated headers are joined with `", "`.
    pub response_headers: BTreeMap<String, String>,
}

impl ExchangeRecord {
    pub fn new(request_body: String, response: InboundResponse) -> Self {
        let mut response_headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers {
            response_headers
                .entry(name.to_ascii_lowercase())
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(&value);
                })
                .or_insert(value);
        }
        Self {
            request_body,
            response_body: response.body,
            response_headers,
        }
    }
}

/// Receiver of interceptor events.
pub trait ExchangeListener: Send + Sync {
    fn on_request_sent(&self, id: &CorrelationId, request: &OutboundRequest);
    fn on_response_received(&self, id: &CorrelationId, response: InboundResponse);
    fn on_request_failed(&self, id: &CorrelationId, failure: ExchangeFailure);
}
