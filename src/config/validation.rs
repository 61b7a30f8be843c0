//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog bounded, poll interval > 0)
//! - Check that access prefixes and addresses parse
//! - Check the handler matches the binary's service
//! - Check the log level names a tracing level
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatcherConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::config::schema::{DispatcherConfig, ServiceKind};
use crate::net::listener::MAX_BACKLOG;
use crate::security::NetworkPrefix;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not an IP address")]
    BindAddress(String),

    #[error("listener.backlog must be between 1 and {max}, got {0}", max = MAX_BACKLOG)]
    Backlog(u32),

    #[error("listener.poll_interval_ms must be greater than zero")]
    PollInterval,

    #[error("access.allow must list at least one network prefix")]
    NoAllowedNetworks,

    #[error("access.allow entry rejected: {0}")]
    Prefix(String),

    #[error("handler.program '{0}' must be an absolute path")]
    RelativeProgram(String),

    #[error("handler.service is '{found}' but this dispatcher serves '{expected}'")]
    ServiceMismatch { expected: &'static str, found: &'static str },

    #[error("handler.world only applies to the web service")]
    WorldWithoutWeb,

    #[error("observability.log_level '{0}' is not one of off, error, warn, info, debug, trace")]
    LogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration for the given service.
pub fn validate_config(config: &DispatcherConfig, expected: ServiceKind) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.backlog == 0 || config.listener.backlog > MAX_BACKLOG {
        errors.push(ValidationError::Backlog(config.listener.backlog));
    }
    if config.listener.poll_interval_ms == 0 {
        errors.push(ValidationError::PollInterval);
    }

    if config.access.allow.is_empty() {
        errors.push(ValidationError::NoAllowedNetworks);
    }
    for entry in &config.access.allow {
        if let Err(e) = entry.parse::<NetworkPrefix>() {
            errors.push(ValidationError::Prefix(e.to_string()));
        }
    }

    if !config.handler.program.is_absolute() {
        errors.push(ValidationError::RelativeProgram(config.handler.program.display().to_string()));
    }
    if config.handler.service != expected {
        errors.push(ValidationError::ServiceMismatch {
            expected: expected.as_str(),
            found: config.handler.service.as_str(),
        });
    }
    if config.handler.world && config.handler.service != ServiceKind::Web {
        errors.push(ValidationError::WorldWithoutWeb);
    }

    if config.observability.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(config.observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
