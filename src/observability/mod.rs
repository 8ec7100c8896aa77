//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine and interceptor produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Correlation id flows through every log line touching a call
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
