//! Span model and export sinks.
//!
//! # Data Flow
//! ```text
//! Span lifecycle source (host tracer)
//!     → model.rs (finished Span handed to the engine)
//!     → engine suppresses or passes it through
//!     → export.rs (SpanExporter receives the republished span)
//! ```
//!
//! # Design Decisions
//! - A finished span is never mutated in place; enrichment builds a new one
//! - The `sampled` flag is the only thing the engine flips on the original
//! - Attribute values are JSON values so bodies and headers fit without a
//!   dedicated value enum

pub mod export;
pub mod model;

pub use export::{InMemoryExporter, LogExporter, SpanExporter};
pub use model::{Span, SpanEvent, SpanId, SpanKind, SpanStatus, TraceId};
