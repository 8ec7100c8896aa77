//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the correlator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Correlation engine settings.
    pub engine: EngineConfig,

    /// Exchange interceptor settings.
    pub interceptor: InterceptorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Diagnostics endpoint settings.
    pub admin: AdminConfig,
}

/// Correlation engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a pending exchange or span completion is kept, in seconds.
    pub retention_secs: u64,

    /// Interval between sweeps of expired store entries, in seconds.
    pub sweep_interval_secs: u64,

    /// Drain timeout applied by `shutdown()`, in milliseconds.
    pub flush_timeout_ms: u64,

    /// Header carrying the correlation id on outbound calls.
    pub correlation_header: String,
}

impl EngineConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_secs: 600,
            sweep_interval_secs: 30,
            flush_timeout_ms: 5000,
            correlation_header: "x-correlation-id".to_string(),
        }
    }
}

/// Exchange interceptor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// Largest request or response body materialized as text.
    pub max_body_bytes: usize,

    /// Upstream connection timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            connect_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Diagnostics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the diagnostics router.
    pub enabled: bool,

    /// Diagnostics bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
