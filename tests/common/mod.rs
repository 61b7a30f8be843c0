//! Shared utilities for dispatcher integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use conn_dispatch::config::ListenerConfig;
use conn_dispatch::handoff::HandoffSpec;
use conn_dispatch::net::Listener;
use conn_dispatch::security::AccessPolicy;
use conn_dispatch::{Dispatcher, Step};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Upper bound on any single client exchange.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Write an executable `/bin/sh` handler script.
pub fn write_handler(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A dispatcher on an ephemeral loopback port.
pub fn start_dispatcher(spec: HandoffSpec, allow: &[&str], poll_interval: Duration) -> Dispatcher {
    let listener = Listener::bind(&ListenerConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        backlog: 5,
        poll_interval_ms: poll_interval.as_millis() as u64,
    })
    .unwrap();
    let policy = AccessPolicy::from_prefixes(allow).unwrap();
    Dispatcher::new(listener, policy, spec, poll_interval)
}

/// Connect, send `request`, half-close, and read until the server side closes.
pub async fn client_exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    if !request.is_empty() {
        stream.write_all(request).await.unwrap();
    }
    let mut reply = Vec::new();
    tokio::time::timeout(EXCHANGE_TIMEOUT, stream.read_to_end(&mut reply))
        .await
        .expect("server never closed the connection")
        .unwrap();
    reply
}

/// Drive one dispatcher turn while a client connects and talks to whatever
/// ends up owning the connection.
pub async fn exchange(dispatcher: &mut Dispatcher, request: &[u8]) -> (Step, Vec<u8>) {
    let addr = dispatcher.local_addr().unwrap();
    let (step, reply) = tokio::join!(dispatcher.turn(), client_exchange(addr, request));
    (step.unwrap(), reply)
}

/// Run idle turns until every worker is reaped. Returns the turns used.
pub async fn drain_workers(dispatcher: &mut Dispatcher, max_turns: usize) -> Option<usize> {
    for turn in 0..max_turns {
        if dispatcher.outstanding_workers() == 0 {
            return Some(turn);
        }
        dispatcher.turn().await.unwrap();
    }
    (dispatcher.outstanding_workers() == 0).then_some(max_turns)
}
