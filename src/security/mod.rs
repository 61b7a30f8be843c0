//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection:
//!     → access_control.rs (peer address vs allowed prefixes)
//!     → admitted: hand off to a worker
//!     → rejected: close, log, no worker
//! ```
//!
//! # Design Decisions
//! - Perimeter control only; the dispatcher is assumed to run inside a trusted network
//! - Fail closed: an empty policy admits nothing

pub mod access_control;

pub use access_control::{AccessPolicy, NetworkPrefix, PrefixParseError};
