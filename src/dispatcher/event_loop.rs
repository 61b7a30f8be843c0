//! The dispatcher loop: poll → accept → filter → handoff → reap.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::handoff::{dispatch, HandoffSpec};
use crate::lifecycle::reaper::ReapSet;
use crate::net::poller::accept_backoff;
use crate::net::{wait_readable, AcceptClock, Connection, Listener, PollError, Readiness};
use crate::observability::metrics;
use crate::security::AccessPolicy;

/// Outcome of one loop turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The poll interval elapsed with no connection.
    Idle,
    /// A pending connection could not be accepted.
    AcceptFailed,
    /// The peer is outside the allowed networks; the socket was closed.
    Rejected { peer: SocketAddr },
    /// A worker now owns the connection.
    Dispatched { peer: SocketAddr, pid: u32 },
    /// Process creation failed; the socket was closed.
    SpawnFailed { peer: SocketAddr },
}

/// Single-threaded connection dispatcher.
#[derive(Debug)]
pub struct Dispatcher {
    listener: Listener,
    policy: AccessPolicy,
    spec: HandoffSpec,
    poll_interval: Duration,
    reaper: ReapSet,
    clock: AcceptClock,
    accept_failures: u32,
}

impl Dispatcher {
    pub fn new(listener: Listener, policy: AccessPolicy, spec: HandoffSpec, poll_interval: Duration) -> Self {
        Self {
            listener,
            policy,
            spec,
            poll_interval,
            reaper: ReapSet::new(),
            clock: AcceptClock::new(),
            accept_failures: 0,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Workers spawned but not yet reaped.
    pub fn outstanding_workers(&self) -> usize {
        self.reaper.len()
    }

    /// Run until `shutdown` fires. Only a broken listening socket ends the
    /// loop with an error; every per-connection failure is logged and skipped.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), PollError> {
        tracing::info!(
            address = ?self.local_addr().ok(),
            program = %self.spec.program().display(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Dispatcher running"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Dispatcher received shutdown signal, exiting loop");
                    break;
                }
                step = self.turn() => {
                    if let Err(e) = step {
                        tracing::error!(error = %e, "Readiness polling failed");
                        return Err(e);
                    }
                }
            }
        }

        self.reap();
        if !self.reaper.is_empty() {
            tracing::info!(
                outstanding = self.reaper.len(),
                "Leaving running workers to finish on their own"
            );
        }
        Ok(())
    }

    /// One pass through the state machine.
    pub async fn turn(&mut self) -> Result<Step, PollError> {
        self.reap();

        let step = match wait_readable(&self.listener, self.poll_interval).await? {
            Readiness::TimedOut => Step::Idle,
            Readiness::AcceptFailed(e) => {
                self.accept_failures = self.accept_failures.saturating_add(1);
                tracing::warn!(
                    error = %e,
                    consecutive = self.accept_failures,
                    "Failed to accept connection"
                );
                metrics::record_accept_error();
                tokio::time::sleep(accept_backoff(self.accept_failures)).await;
                Step::AcceptFailed
            }
            Readiness::Ready { stream, peer } => {
                self.accept_failures = 0;
                let conn = Connection::new(stream, peer, self.clock.stamp());
                self.route(conn)
            }
        };

        Ok(step)
    }

    fn route(&mut self, conn: Connection) -> Step {
        let peer = conn.peer();

        if !self.policy.is_authorized(peer.ip()) {
            tracing::warn!(
                connection_id = %conn.id(),
                peer = %peer,
                "Unauthorized source, closing connection"
            );
            conn.reject();
            metrics::record_rejected();
            return Step::Rejected { peer };
        }

        let connection_id = conn.id();
        match dispatch(conn, &self.spec) {
            Ok(worker) => {
                let pid = worker.pid();
                tracing::info!(connection_id = %connection_id, peer = %peer, pid, "Connection handed off");
                self.reaper.insert(worker);
                metrics::record_dispatched();
                metrics::set_outstanding_workers(self.reaper.len());
                Step::Dispatched { peer, pid }
            }
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    peer = %peer,
                    error = %e,
                    "Handoff failed, connection closed"
                );
                metrics::record_spawn_failed();
                Step::SpawnFailed { peer }
            }
        }
    }

    fn reap(&mut self) {
        let reaped = self.reaper.reap();
        if reaped > 0 {
            metrics::record_reaped(reaped);
            metrics::set_outstanding_workers(self.reaper.len());
        }
    }
}
