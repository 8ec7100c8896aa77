//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CorrelatorConfig (validated, immutable)
//!     → engine / interceptor / observability read their section
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the engine copies what it needs at construction
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AdminConfig, CorrelatorConfig, EngineConfig, InterceptorConfig, ObservabilityConfig};
