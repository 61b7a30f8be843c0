//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bound socket, bounded backlog)
//!     → poller.rs (bounded wait + accept, transient vs fatal errors)
//!     → connection.rs (id, accept stamp, single owner of the socket)
//!     → Hand off to the access filter and then a worker process
//! ```
//!
//! # Design Decisions
//! - Bounded backlog; the dispatcher never asks for unlimited queuing
//! - Bounded waits so housekeeping runs with zero traffic
//! - Connections are moved, never shared

pub mod connection;
pub mod listener;
pub mod poller;

pub use connection::{AcceptClock, AcceptStamp, Connection, ConnectionId};
pub use listener::{Listener, ListenerError};
pub use poller::{wait_readable, PollError, Readiness};
