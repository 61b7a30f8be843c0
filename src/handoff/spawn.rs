//! Worker process creation.
//!
//! The accepted socket is pulled off the reactor, switched back to blocking
//! mode and moved into the child's stdin. The spawn command owns the
//! dispatcher's copy of the descriptor, so dropping it right after the spawn
//! closes that copy on the success and failure paths alike.

use std::ffi::OsString;
use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use crate::config::{HandlerConfig, ServiceKind};
use crate::handoff::args::{ArgumentBuilder, HandoffContext, RelayArgs, WebArgs};
use crate::net::{Connection, ConnectionId};

/// Error type for a single handoff. Never fatal to the dispatcher.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("failed to detach socket from the reactor: {0}")]
    Detach(#[source] io::Error),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Program and argument template for one service.
#[derive(Debug)]
pub struct HandoffSpec {
    program: PathBuf,
    program_name: OsString,
    builder: Box<dyn ArgumentBuilder>,
}

impl HandoffSpec {
    pub fn new(program: impl Into<PathBuf>, builder: Box<dyn ArgumentBuilder>) -> Self {
        let program = program.into();
        let program_name = program
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| program.clone().into_os_string());
        Self {
            program,
            program_name,
            builder,
        }
    }

    pub fn from_config(config: &HandlerConfig) -> Self {
        let builder: Box<dyn ArgumentBuilder> = match config.service {
            ServiceKind::Web => Box::new(WebArgs { world: config.world }),
            ServiceKind::Relay => Box::new(RelayArgs),
        };
        Self::new(config.program.clone(), builder)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument vector, argv[0] included.
    pub fn argv(&self, ctx: &HandoffContext) -> Vec<OsString> {
        std::iter::once(self.program_name.clone())
            .chain(self.builder.build(ctx).into_iter().map(OsString::from))
            .collect()
    }
}

/// A spawned handler, tracked until it is reaped.
#[derive(Debug)]
pub struct Worker {
    pid: u32,
    connection_id: ConnectionId,
    peer: SocketAddr,
    spawned_at: Instant,
    child: Child,
}

impl Worker {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn age(&self) -> Duration {
        self.spawned_at.elapsed()
    }

    /// Collect the exit status if the worker has finished. Never blocks.
    pub fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }
}

/// Hand `conn` off to a new worker process described by `spec`.
///
/// Descriptor 0 of the worker is the client socket. If the program cannot be
/// executed the child exits non-zero on its own and the failure is reported
/// here as [`HandoffError::Spawn`].
pub fn dispatch(conn: Connection, spec: &HandoffSpec) -> Result<Worker, HandoffError> {
    let connection_id = conn.id();
    let peer = conn.peer();
    let accepted_at = conn.accepted_at();

    let socket = detach(conn.into_stream()).map_err(HandoffError::Detach)?;
    let ctx = HandoffContext {
        connection_id,
        peer,
        descriptor: socket.as_raw_fd(),
        accepted_at,
    };
    let argv = spec.argv(&ctx);

    let spawned = {
        let mut command = Command::new(&spec.program);
        command
            .arg0(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::from(socket))
            .kill_on_drop(false);

        if spec.builder.passes_descriptor() {
            let fd = ctx.descriptor;
            // SAFETY: the closure only calls fcntl(2), which is async-signal-safe,
            // and captures nothing but an integer.
            unsafe {
                command.pre_exec(move || keep_open_across_exec(fd));
            }
        }

        command.spawn()
    };

    let child = spawned.map_err(|source| HandoffError::Spawn {
        program: spec.program.display().to_string(),
        source,
    })?;
    let pid = child.id().unwrap_or(0);

    tracing::debug!(
        connection_id = %connection_id,
        peer = %peer,
        pid,
        argv = ?argv,
        "Worker spawned"
    );

    Ok(Worker {
        pid,
        connection_id,
        peer,
        spawned_at: Instant::now(),
        child,
    })
}

/// Take the socket off the Tokio reactor and hand back a blocking descriptor.
fn detach(stream: TcpStream) -> io::Result<OwnedFd> {
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    Ok(OwnedFd::from(stream))
}

/// Runs in the forked child before exec: clear close-on-exec so the handler
/// finds the socket under the descriptor number it was given.
fn keep_open_across_exec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor this process owns; no memory is touched.
    if unsafe { libc::fcntl(fd, libc::F_SETFD, 0) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::AcceptStamp;

    fn context(descriptor: RawFd) -> HandoffContext {
        HandoffContext {
            connection_id: ConnectionId::new(),
            peer: "10.1.2.3:5555".parse().unwrap(),
            descriptor,
            accepted_at: AcceptStamp { secs: 12, micros: 34 },
        }
    }

    #[test]
    fn test_web_argv_uses_program_file_name() {
        let plain = HandoffSpec::new("/srv/handler", Box::new(WebArgs { world: false }));
        assert_eq!(plain.argv(&context(4)), vec![OsString::from("handler")]);

        let world = HandoffSpec::new("/srv/handler", Box::new(WebArgs { world: true }));
        assert_eq!(
            world.argv(&context(4)),
            vec![OsString::from("handler"), OsString::from("-world")]
        );
    }

    #[test]
    fn test_relay_argv() {
        let spec = HandoffSpec::new("/usr/libexec/relay", Box::new(RelayArgs));
        let argv: Vec<_> = spec
            .argv(&context(9))
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(argv, vec!["relay", "9", "12", "34"]);
    }

    #[test]
    fn test_from_config_picks_builder() {
        let spec = HandoffSpec::from_config(&HandlerConfig {
            service: ServiceKind::Relay,
            program: PathBuf::from("/srv/relay"),
            world: false,
        });
        assert_eq!(spec.program(), Path::new("/srv/relay"));
        assert!(spec.builder.passes_descriptor());

        let spec = HandoffSpec::from_config(&HandlerConfig {
            service: ServiceKind::Web,
            program: PathBuf::from("/srv/www"),
            world: true,
        });
        assert_eq!(spec.argv(&context(3)).len(), 2);
        assert!(!spec.builder.passes_descriptor());
    }
}
