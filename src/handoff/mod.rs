//! Connection handoff subsystem.
//!
//! # Data Flow
//! ```text
//! Authorized connection
//!     → args.rs (service template → argv[1..])
//!     → spawn.rs (detach socket, child stdin = socket, exec handler)
//!     → parent copy of the socket closed
//!     → Worker recorded in the reap set
//! ```
//!
//! # Handoff Protocol
//! - Descriptor 0 of the handler is the client socket, read and write
//! - Web: `[program_name]` or `[program_name, "-world"]`
//! - Relay: `[program_name, descriptor, seconds, microseconds]`
//! - No return channel; the exit status is only observed when reaping

pub mod args;
pub mod spawn;

pub use args::{ArgumentBuilder, HandoffContext, RelayArgs, WebArgs};
pub use spawn::{dispatch, HandoffError, HandoffSpec, Worker};
