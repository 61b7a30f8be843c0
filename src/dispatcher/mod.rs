//! Dispatcher loop subsystem.
//!
//! # State Machine
//! ```text
//! Polling ──timeout──▶ Polling (reap)
//!    │
//!    └─ready─▶ Accepting ──error──▶ Polling
//!                 │
//!                 ▼
//!             Filtering ──unauthorized──▶ Rejecting ──▶ Polling
//!                 │
//!                 ▼
//!             Dispatching ──spawned / failed──▶ Polling
//! ```
//!
//! # Design Decisions
//! - Process per connection; the dispatcher never services a socket itself
//! - Reaping happens on every entry to Polling
//! - Shutdown stops accepting; workers already running are left alone

pub mod event_loop;

pub use event_loop::{Dispatcher, Step};
