//! Accepted connections and their single-owner lifecycle.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Stamp each connection with its accept time
//! - Own the client socket until exactly one terminal action consumes it
//!
//! Both terminal actions, [`Connection::reject`] and the handoff in
//! [`crate::handoff::dispatch`], take the connection by value, so a socket can
//! never be closed twice or handed to two workers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::TcpStream;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Wall-clock accept time, split the way the relay handler expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AcceptStamp {
    pub secs: u64,
    pub micros: u32,
}

impl AcceptStamp {
    fn from_duration(since_epoch: Duration) -> Self {
        Self {
            secs: since_epoch.as_secs(),
            micros: since_epoch.subsec_micros(),
        }
    }
}

/// Hands out accept stamps that never go backwards within one process,
/// even if the wall clock is stepped back.
#[derive(Debug, Default)]
pub struct AcceptClock {
    last: Option<AcceptStamp>,
}

impl AcceptClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp for a connection accepted now.
    pub fn stamp(&mut self) -> AcceptStamp {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        self.observe(AcceptStamp::from_duration(now))
    }

    fn observe(&mut self, candidate: AcceptStamp) -> AcceptStamp {
        let stamp = match self.last {
            Some(last) if candidate < last => last,
            _ => candidate,
        };
        self.last = Some(stamp);
        stamp
    }
}

/// A freshly accepted client connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    accepted_at: AcceptStamp,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, accepted_at: AcceptStamp) -> Self {
        Self {
            id: ConnectionId::new(),
            stream,
            peer,
            accepted_at,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn accepted_at(&self) -> AcceptStamp {
        self.accepted_at
    }

    /// Close the connection without handing it off.
    ///
    /// The client sees an orderly close and no protocol-level error.
    pub fn reject(self) {
        tracing::trace!(connection_id = %self.id, peer = %self.peer, "Connection closed without handoff");
        drop(self.stream);
    }

    /// Give up ownership of the socket to the handoff.
    pub(crate) fn into_stream(self) -> TcpStream {
        self.stream
    }
}
