//! Ordered startup shared by both dispatcher binaries.
//!
//! Config → logging → metrics → listener → access policy → dispatcher loop.
//! Any failure before the loop runs is fatal and maps to exit status 1.

use std::net::SocketAddr;
use std::process::ExitCode;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::{ConfigError, DispatcherConfig, ObservabilityConfig};
use crate::dispatcher::Dispatcher;
use crate::handoff::HandoffSpec;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::net::{Listener, ListenerError, PollError};
use crate::observability::{init_logging, metrics};
use crate::security::{AccessPolicy, PrefixParseError};

/// Fatal errors that end the dispatcher process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("invalid access policy: {0}")]
    Access(#[from] PrefixParseError),

    #[error(transparent)]
    Poll(#[from] PollError),
}

/// Bind, build the dispatcher and run it until `shutdown` fires.
pub async fn launch(config: DispatcherConfig, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
    tracing::info!(
        service = config.handler.service.as_str(),
        address = %config.listener.socket_address(),
        backlog = config.listener.backlog,
        poll_interval_ms = config.listener.poll_interval_ms,
        program = %config.handler.program.display(),
        world = config.handler.world,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::warn!(error = %e, "Metrics endpoint unavailable, continuing without it");
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let listener = Listener::bind(&config.listener)?;
    let policy = AccessPolicy::from_prefixes(&config.access.allow)?;
    let allowed: Vec<String> = policy.prefixes().iter().map(ToString::to_string).collect();
    tracing::info!(allow = ?allowed, "Access policy loaded");
    let spec = HandoffSpec::from_config(&config.handler);

    Dispatcher::new(listener, policy, spec, config.listener.poll_interval())
        .run(shutdown)
        .await?;
    Ok(())
}

/// Entry point used by the binaries once the configuration is resolved.
pub async fn run(config: DispatcherConfig) -> ExitCode {
    init_logging(&config.observability);
    tracing::info!(
        service = config.handler.service.as_str(),
        version = env!("CARGO_PKG_VERSION"),
        "conn-dispatch starting"
    );

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    // Keep a sender alive here so a failed signal install cannot close the channel.
    spawn_signal_listener(shutdown.clone());

    let outcome = launch(config, receiver).await;
    drop(shutdown);

    match &outcome {
        Ok(()) => tracing::info!("Shutdown complete"),
        Err(e) => tracing::error!(error = %e, "Dispatcher failed"),
    }
    ExitCode::from(exit_status(&outcome))
}

/// 0 after a signal-driven shutdown, 1 for any fatal error.
pub fn exit_status(outcome: &Result<(), StartupError>) -> u8 {
    match outcome {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Log a configuration failure with default logging and pick the exit code.
pub fn report_config_error(error: &ConfigError) -> ExitCode {
    init_logging(&ObservabilityConfig::default());
    tracing::error!(error = %error, "Failed to load configuration");
    ExitCode::FAILURE
}
