//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher loop produces:
//!     → logging.rs (structured events: peer, connection_id, pid)
//!     → metrics.rs (connection outcomes, reaped/outstanding workers)
//!
//! Consumers:
//!     → stderr (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
