//! Failure injection tests for the dispatcher loop.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use conn_dispatch::handoff::{HandoffSpec, WebArgs};
use conn_dispatch::Step;
use tempfile::TempDir;
use tokio::net::TcpStream;

mod common;

const POLL: Duration = Duration::from_millis(50);

#[tokio::test]
async fn test_peer_reset_before_accept_does_not_stop_service() {
    let dir = TempDir::new().unwrap();
    let handler = common::write_handler(dir.path(), "handler", "printf ok >&0 2>/dev/null");

    let spec = HandoffSpec::new(&handler, Box::new(WebArgs::default()));
    let mut dispatcher = common::start_dispatcher(spec, &["127.0.0.0/8"], POLL);
    let addr = dispatcher.local_addr().unwrap();

    // Abortive close: the queued connection is reset before the dispatcher
    // accepts it. Linux still hands out reset connections from the backlog,
    // so each one reaches a worker that sees the reset; descriptor exhaustion
    // covers the failed-accept path in accept_exhaustion.rs.
    for _ in 0..3 {
        let stream = TcpStream::connect(addr).await.unwrap();
        #[allow(deprecated)]
        stream.set_linger(Some(Duration::ZERO)).unwrap();
        drop(stream);
    }

    for _ in 0..3 {
        let step = dispatcher.turn().await.expect("reset peers must not be fatal");
        assert!(matches!(step, Step::Dispatched { .. }), "unexpected step {step:?}");
    }

    let (step, reply) = common::exchange(&mut dispatcher, b"").await;
    assert!(matches!(step, Step::Dispatched { .. }));
    assert_eq!(reply, b"ok");

    assert!(common::drain_workers(&mut dispatcher, 100).await.is_some());
}

#[tokio::test]
async fn test_missing_program_closes_connection_and_continues() {
    let spec = HandoffSpec::new("/nonexistent/conn-dispatch/handler", Box::new(WebArgs::default()));
    let mut dispatcher = common::start_dispatcher(spec, &["127.0.0.0/8"], POLL);

    for _ in 0..2 {
        let (step, reply) = common::exchange(&mut dispatcher, b"").await;
        assert!(matches!(step, Step::SpawnFailed { .. }), "got {step:?}");
        assert!(reply.is_empty());
    }
    assert_eq!(dispatcher.outstanding_workers(), 0);
}

#[tokio::test]
async fn test_non_executable_program_is_a_spawn_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("not-executable");
    fs::write(&path, "#!/bin/sh\nprintf never >&0\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    let spec = HandoffSpec::new(&path, Box::new(WebArgs::default()));
    let mut dispatcher = common::start_dispatcher(spec, &["127.0.0.0/8"], POLL);

    let (step, reply) = common::exchange(&mut dispatcher, b"").await;
    assert!(matches!(step, Step::SpawnFailed { .. }));
    assert!(reply.is_empty());
}

#[tokio::test]
async fn test_failing_handler_does_not_affect_next_connection() {
    let dir = TempDir::new().unwrap();
    let handler = common::write_handler(
        dir.path(),
        "flaky",
        r#"read line; if [ "$line" = crash ]; then kill -9 $$; fi; printf fine >&0"#,
    );

    let spec = HandoffSpec::new(&handler, Box::new(WebArgs::default()));
    let mut dispatcher = common::start_dispatcher(spec, &["127.0.0.0/8"], POLL);

    let (step, reply) = common::exchange(&mut dispatcher, b"crash\n").await;
    assert!(matches!(step, Step::Dispatched { .. }));
    assert!(reply.is_empty());

    let (step, reply) = common::exchange(&mut dispatcher, b"hello\n").await;
    assert!(matches!(step, Step::Dispatched { .. }));
    assert_eq!(reply, b"fine");

    assert!(common::drain_workers(&mut dispatcher, 100).await.is_some());
}

#[tokio::test]
async fn test_idle_turns_time_out() {
    let spec = HandoffSpec::new("/bin/true", Box::new(WebArgs::default()));
    let mut dispatcher = common::start_dispatcher(spec, &["127.0.0.0/8"], Duration::from_millis(20));

    let started = std::time::Instant::now();
    assert_eq!(dispatcher.turn().await.unwrap(), Step::Idle);
    assert!(started.elapsed() >= Duration::from_millis(20));
}
