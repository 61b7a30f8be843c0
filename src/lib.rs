//! Connection dispatcher library.
//!
//! Accepts TCP connections, checks the peer against allowed networks and
//! hands each admitted connection to a freshly spawned handler process whose
//! descriptor 0 is the client socket.

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod handoff;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::DispatcherConfig;
pub use dispatcher::{Dispatcher, Step};
pub use lifecycle::Shutdown;
