//! Per-service argument templates.
//!
//! Each backend expects its own argv after the program name. Builders only
//! see a [`HandoffContext`] snapshot, never the socket itself.

use std::net::SocketAddr;
use std::os::fd::RawFd;

use crate::net::{AcceptStamp, ConnectionId};

/// What an argument builder may know about the connection being handed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffContext {
    pub connection_id: ConnectionId,
    pub peer: SocketAddr,
    /// Descriptor number of the socket in the dispatcher, kept at the same
    /// number in the worker when [`ArgumentBuilder::passes_descriptor`] is true.
    pub descriptor: RawFd,
    pub accepted_at: AcceptStamp,
}

/// Builds the handler's arguments (argv[1..]) for one connection.
pub trait ArgumentBuilder: Send + Sync + std::fmt::Debug {
    fn build(&self, ctx: &HandoffContext) -> Vec<String>;

    /// True if the built arguments name the socket descriptor, which then has
    /// to stay open in the worker under that number.
    fn passes_descriptor(&self) -> bool {
        false
    }
}

/// Web server handler: `[-world]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebArgs {
    pub world: bool,
}

impl ArgumentBuilder for WebArgs {
    fn build(&self, _ctx: &HandoffContext) -> Vec<String> {
        if self.world {
            vec!["-world".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Relay handler: `[descriptor, seconds, microseconds]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayArgs;

impl ArgumentBuilder for RelayArgs {
    fn build(&self, ctx: &HandoffContext) -> Vec<String> {
        vec![
            ctx.descriptor.to_string(),
            ctx.accepted_at.secs.to_string(),
            ctx.accepted_at.micros.to_string(),
        ]
    }

    fn passes_descriptor(&self) -> bool {
        true
    }
}
