//! Egress correlator library.
//!
//! Joins each outbound HTTP exchange to the client span that traced it and
//! republishes that span enriched with the request and response payloads.

pub mod admin;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod interceptor;
pub mod lifecycle;
pub mod observability;
pub mod span;

pub use config::schema::CorrelatorConfig;
pub use correlation::CorrelationId;
pub use engine::{CorrelationEngine, CorrelationError, FlushOutcome, SpanDisposition, SpanHooks};
pub use interceptor::{InterceptingClient, RawHeaders};
pub use lifecycle::Shutdown;
pub use span::{Span, SpanExporter};
