//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! service defaults (web: 2784, relay: 3000)
//!     → loader.rs (optional TOML file layered over defaults)
//!     → CLI overrides (port, allow, handler, -world)
//!     → validation.rs (semantic checks)
//!     → DispatcherConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the listener never changes after startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AccessConfig, DispatcherConfig, HandlerConfig, ListenerConfig, LogFormat, ObservabilityConfig, ServiceKind,
};
pub use validation::{validate_config, ValidationError};
