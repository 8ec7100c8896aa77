//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     engine.shutdown() → latch flipped → drain live merge tasks → sweeper stopped
//!
//! Signals (signals.rs):
//!     SIGINT → serve loop ends → engine.shutdown()
//! ```
//!
//! # Design Decisions
//! - Shutdown has a timeout: tasks still pending are abandoned to TTL expiry
//! - Shutdown is idempotent

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
