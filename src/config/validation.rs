//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (durations > 0, sweep within retention)
//! - Check the correlation header is a usable header name
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CorrelatorConfig → Result<(), Vec<ValidationError>>

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::CorrelatorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("engine.sweep_interval_secs ({sweep}) exceeds engine.retention_secs ({retention})")]
    SweepExceedsRetention { sweep: u64, retention: u64 },

    #[error("engine.correlation_header {0:?} is not a lower-case header name")]
    InvalidHeader(String),
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &CorrelatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let engine = &config.engine;

    if engine.retention_secs == 0 {
        errors.push(ValidationError::Zero { field: "engine.retention_secs" });
    }
    if engine.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "engine.sweep_interval_secs" });
    } else if engine.retention_secs > 0 && engine.sweep_interval_secs > engine.retention_secs {
        errors.push(ValidationError::SweepExceedsRetention {
            sweep: engine.sweep_interval_secs,
            retention: engine.retention_secs,
        });
    }
    if engine.flush_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "engine.flush_timeout_ms" });
    }

    // Must already be canonical: HeaderName::from_bytes would lower it silently.
    let header = &engine.correlation_header;
    let lower = header.to_ascii_lowercase();
    if header.is_empty() || *header != lower || HeaderName::from_bytes(header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeader(header.clone()));
    }

    if config.interceptor.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "interceptor.max_body_bytes" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
