//! Readiness polling on the listening socket.
//!
//! # Responsibilities
//! - Wait for a pending connection, bounded by the poll interval
//! - Separate transient accept failures from a broken listening socket
//!
//! On the Tokio reactor readiness and accept are one operation, so a ready
//! result already carries the accepted stream. `TcpListener::accept` is
//! cancel-safe, so timing it out never loses a connection.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

use crate::net::listener::Listener;

/// Result of one bounded wait on the listener.
#[derive(Debug)]
pub enum Readiness {
    /// A connection was pending and has been accepted.
    Ready { stream: TcpStream, peer: SocketAddr },
    /// Nothing arrived within the poll interval.
    TimedOut,
    /// A connection was pending but accepting it failed (peer reset, fd exhaustion, ...).
    AcceptFailed(io::Error),
}

/// The listening socket itself is unusable.
#[derive(Debug, Error)]
#[error("listening socket failed: {0}")]
pub struct PollError(#[source] pub io::Error);

/// Wait up to `timeout` for a connection and accept it.
pub async fn wait_readable(listener: &Listener, timeout: Duration) -> Result<Readiness, PollError> {
    match time::timeout(timeout, listener.accept()).await {
        Err(_elapsed) => Ok(Readiness::TimedOut),
        Ok(accepted) => classify_accept(accepted),
    }
}

fn classify_accept(accepted: io::Result<(TcpStream, SocketAddr)>) -> Result<Readiness, PollError> {
    match accepted {
        Ok((stream, peer)) => Ok(Readiness::Ready { stream, peer }),
        Err(e) if is_fatal_accept_error(&e) => Err(PollError(e)),
        Err(e) => Ok(Readiness::AcceptFailed(e)),
    }
}

/// Errors that mean the listening descriptor is broken rather than one
/// pending connection.
pub fn is_fatal_accept_error(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EBADF | libc::EINVAL | libc::ENOTSOCK | libc::EOPNOTSUPP | libc::EFAULT)
    )
}

/// Delay before polling again after `consecutive` accept failures in a row.
///
/// Exhausted descriptor tables leave the connection queued, so the listener
/// stays readable; without a pause the loop would spin on the same error.
pub fn accept_backoff(consecutive: u32) -> Duration {
    const BASE_MS: u64 = 10;
    const MAX_MS: u64 = 1_000;

    if consecutive == 0 {
        return Duration::ZERO;
    }
    let factor = 2u64.saturating_pow(consecutive - 1);
    Duration::from_millis(BASE_MS.saturating_mul(factor).min(MAX_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListenerConfig;

    fn listener() -> Listener {
        Listener::bind(&ListenerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            backlog: 5,
            poll_interval_ms: 50,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_times_out_without_traffic() {
        let listener = listener();
        let outcome = wait_readable(&listener, Duration::from_millis(20)).await.unwrap();
        assert!(matches!(outcome, Readiness::TimedOut));
    }

    #[tokio::test]
    async fn test_ready_when_client_connects() {
        let listener = listener();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();

        let outcome = wait_readable(&listener, Duration::from_secs(5)).await.unwrap();
        match outcome {
            Readiness::Ready { peer, .. } => assert!(peer.ip().is_loopback()),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[test]
    fn test_fatal_error_classification() {
        assert!(is_fatal_accept_error(&io::Error::from_raw_os_error(libc::EBADF)));
        assert!(is_fatal_accept_error(&io::Error::from_raw_os_error(libc::ENOTSOCK)));
        assert!(!is_fatal_accept_error(&io::Error::from_raw_os_error(libc::ECONNABORTED)));
        assert!(!is_fatal_accept_error(&io::Error::from_raw_os_error(libc::EMFILE)));
        assert!(!is_fatal_accept_error(&io::Error::new(io::ErrorKind::Other, "synthetic")));
    }

    #[test]
    fn test_broken_listener_errors_are_fatal() {
        for errno in [libc::EBADF, libc::EINVAL, libc::ENOTSOCK] {
            let err = classify_accept(Err(io::Error::from_raw_os_error(errno))).unwrap_err();
            assert_eq!(err.0.raw_os_error(), Some(errno));
        }
    }

    #[test]
    fn test_per_connection_errors_are_not_fatal() {
        for errno in [libc::EMFILE, libc::ENFILE, libc::ECONNABORTED] {
            match classify_accept(Err(io::Error::from_raw_os_error(errno))) {
                Ok(Readiness::AcceptFailed(e)) => assert_eq!(e.raw_os_error(), Some(errno)),
                other => panic!("expected AcceptFailed for errno {errno}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_accept_backoff_grows_and_caps() {
        assert_eq!(accept_backoff(0), Duration::ZERO);
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(30), Duration::from_millis(1_000));
    }
}
