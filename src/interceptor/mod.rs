//! Exchange interception subsystem.
//!
//! # Data Flow
//! ```text
//! Host builds outbound Request
//!     → client.rs tags it with the correlation header
//!     → host tracer runs the request hook (headers.rs normalizes its carrier)
//!     → client.rs dispatches, buffering bodies
//!     → events.rs: request-sent / response-received / request-failed
//!     → ExchangeListener (the engine)
//! ```
//!
//! # Design Decisions
//! - Bodies are assumed to fit in memory; a size cap turns oversized
//!   bodies into a reported failure instead of a partial capture
//! - Header carriers are a closed enum normalized by one exhaustive match

pub mod client;
pub mod events;
pub mod headers;

pub use client::{InterceptError, InterceptingClient};
pub use events::{ExchangeFailure, ExchangeListener, ExchangeRecord, InboundResponse, OutboundRequest};
pub use headers::{find, HeaderList, RawHeaders};
