//! Correlation store subsystem.
//!
//! # Data Flow
//! ```text
//! request hook
//!     → store.rs: exchange slot (by CorrelationId) + span slot (by SpanId)
//! interceptor events / span end
//!     → resolve the matching slot
//! merge task finalizer or TTL expiry
//!     → entries removed
//! request-sent event
//!     → hostname.rs (diagnostic index, cleaned up with the id)
//! ```
//!
//! # Design Decisions
//! - Two independent maps with the same retention window
//! - Steady-state memory is bounded by retention × call rate

pub mod hostname;
pub mod id;
pub mod store;

pub use hostname::HostnameIndex;
pub use id::CorrelationId;
pub use store::TtlMap;
