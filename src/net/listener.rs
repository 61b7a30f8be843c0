//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address and port
//! - Mark the socket listening with a bounded backlog
//! - Accept incoming TCP connections
//!
//! Bind and listen failures are fatal at startup: the dispatcher has nothing
//! to serve from without its socket, so there is no retry.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::ListenerConfig;

/// Largest backlog the dispatcher will request (Linux `somaxconn` default).
pub const MAX_BACKLOG: u32 = 4096;

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address is malformed or cannot be claimed.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// listen(2) was refused.
    #[error("Failed to listen: {0}")]
    Listen(#[source] std::io::Error),

    /// The requested backlog is outside what the dispatcher will ask for.
    #[error("Backlog {0} outside 1..={max}", max = MAX_BACKLOG)]
    BacklogOutOfRange(u32),
}

/// The dispatcher's listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind and listen on the configured address.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let address = config.socket_address();
        let bind_err = |source: std::io::Error| ListenerError::Bind {
            address: address.clone(),
            source,
        };

        if config.backlog == 0 || config.backlog > MAX_BACKLOG {
            return Err(ListenerError::BacklogOutOfRange(config.backlog));
        }

        let addr: SocketAddr = address
            .parse()
            .map_err(|e| bind_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;

        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let inner = socket.listen(config.backlog).map_err(ListenerError::Listen)?;

        let local_addr = inner.local_addr().map_err(bind_err)?;
        tracing::info!(
            address = %local_addr,
            backlog = config.backlog,
            "Listener bound"
        );

        Ok(Self { inner })
    }

    /// Accept the next pending connection.
    pub async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
