//! Worker reaping.
//!
//! Finished workers are collected with a non-blocking wait at the start of
//! every poll cycle. The poll interval bounds how long a zombie can linger,
//! and unlike ignoring SIGCHLD the exit status stays observable and is logged.
//!
//! The set is only touched by the dispatcher task. A multi-threaded
//! dispatcher would have to put it behind a lock.

use std::os::unix::process::ExitStatusExt;

use crate::handoff::Worker;

/// Spawned workers that have not been reaped yet.
#[derive(Debug, Default)]
pub struct ReapSet {
    workers: Vec<Worker>,
}

impl ReapSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, worker: Worker) {
        self.workers.push(worker);
    }

    /// Number of workers still outstanding.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Collect every finished worker. Returns how many were reaped.
    pub fn reap(&mut self) -> usize {
        let before = self.workers.len();

        self.workers.retain_mut(|worker| match worker.try_reap() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::debug!(
                    pid = worker.pid(),
                    connection_id = %worker.connection_id(),
                    peer = %worker.peer(),
                    exit_code = ?status.code(),
                    signal = ?status.signal(),
                    runtime_ms = worker.age().as_millis() as u64,
                    "Worker reaped"
                );
                false
            }
            Err(e) => {
                // The pid is gone from our view of the process table; keeping
                // it would only retry the same failure forever.
                tracing::warn!(pid = worker.pid(), error = %e, "Failed to reap worker, dropping it");
                false
            }
        });

        before - self.workers.len()
    }
}
