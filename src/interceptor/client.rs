//! Outbound HTTP client that tags calls and reports their exchanges.
//!
//! # Responsibilities
//! - Ensure every outbound call carries a correlation id header
//! - Capture request and response bodies as text, up to `max_body_bytes`
//! - Emit request-sent, response-received or request-failed for each call
//!
//! # Design Decisions
//! - Listener callbacks are synchronous and never awaited on, so the
//!   call itself is not delayed by correlation
//! - The response body is buffered once and handed back to the caller intact
//! - The capture limit only bounds what is reported; a body over it is
//!   still sent or returned in full and reported as empty

use axum::body::{Body, Bytes};
use axum::http::{HeaderName, HeaderValue, Request, Response};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::InterceptorConfig;
use crate::correlation::CorrelationId;
use crate::interceptor::events::{ExchangeFailure, ExchangeListener, InboundResponse, OutboundRequest};
use crate::interceptor::headers::header_list;

/// Errors surfaced to the caller of [`InterceptingClient::send`].
#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("invalid correlation header: {0}")]
    InvalidHeader(String),
}

/// HTTP client wrapper that reports every exchange to a listener.
pub struct InterceptingClient {
    client: Client<HttpConnector, Body>,
    listener: Arc<dyn ExchangeListener>,
    header: HeaderName,
    max_body_bytes: usize,
}

impl InterceptingClient {
    /// Create a client tagging calls with `header`.
    pub fn new(
        config: &InterceptorConfig,
        header: &str,
        listener: Arc<dyn ExchangeListener>,
    ) -> Result<Self, InterceptError> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| InterceptError::InvalidHeader(e.to_string()))?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            listener,
            header,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Ensure `request` carries a correlation id, generating one if needed.
    ///
    /// Hosts call this before their tracer runs the request hook so the hook
    /// can read the id from the outgoing headers.
    pub fn tag(&self, request: &mut Request<Body>) -> Result<CorrelationId, InterceptError> {
        let existing = request
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(id) = existing {
            return Ok(CorrelationId::from(id));
        }

        let id = CorrelationId::generate();
        let value = HeaderValue::from_str(id.as_str())
            .map_err(|e| InterceptError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(self.header.clone(), value);
        Ok(id)
    }

    /// Dispatch `request`, reporting the exchange to the listener.
    pub async fn send(&self, mut request: Request<Body>) -> Result<Response<Body>, InterceptError> {
        let id = self.tag(&mut request)?;
        let (parts, body) = request.into_parts();

        let request_bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(&id, format!("request body: {e}"))),
        };

        let outbound = OutboundRequest {
            method: parts.method.to_string(),
            url: parts.uri.to_string(),
            headers: header_list(&parts.headers),
            body: self.capture(&id, "request", &request_bytes),
        };
        tracing::debug!(correlation_id = %id, method = %outbound.method, url = %outbound.url, "Dispatching request");
        self.listener.on_request_sent(&id, &outbound);

        let request = Request::from_parts(parts, Body::from(request_bytes));
        let response: Response<Incoming> = match self.client.request(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(correlation_id = %id, error = %e, "Upstream request failed");
                self.listener.on_request_failed(&id, ExchangeFailure::new(e.to_string()));
                return Err(InterceptError::Transport(e));
            }
        };

        let (parts, body) = response.into_parts();
        let response_bytes = match axum::body::to_bytes(Body::new(body), usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(&id, format!("response body: {e}"))),
        };

        self.listener.on_response_received(
            &id,
            InboundResponse {
                status: parts.status.as_u16(),
                headers: header_list(&parts.headers),
                body: self.capture(&id, "response", &response_bytes),
            },
        );
        tracing::debug!(correlation_id = %id, status = %parts.status, "Response received");

        Ok(Response::from_parts(parts, Body::from(response_bytes)))
    }

    /// Body text for the listener; empty when over the capture limit.
    fn capture(&self, id: &CorrelationId, side: &'static str, bytes: &Bytes) -> String {
        if bytes.len() > self.max_body_bytes {
            tracing::debug!(
                correlation_id = %id,
                side,
                len = bytes.len(),
                limit = self.max_body_bytes,
                "Body over capture limit, not recorded"
            );
            return String::new();
        }
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn fail(&self, id: &CorrelationId, message: String) -> InterceptError {
        tracing::warn!(correlation_id = %id, error = %message, "Exchange body could not be read");
        self.listener.on_request_failed(id, ExchangeFailure::new(message.clone()));
        InterceptError::Body(message)
    }
}
