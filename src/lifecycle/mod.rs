//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve config → Logging → Metrics → Bind listener → Run dispatcher
//!
//! Reaping (reaper.rs):
//!     Every poll cycle → try_wait each worker → drop finished ones
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Final reap → Exit 0
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then the loop
//! - Bind/listen failures exit 1 without retry
//! - Shutdown never kills workers; they finish independently

pub mod reaper;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
