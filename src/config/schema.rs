//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a dispatcher
//! instance. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which backend a dispatcher instance fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Web server handler; argv carries the optional `-world` flag.
    Web,
    /// Generic relay handler; argv carries the descriptor and accept timestamp.
    Relay,
}

impl ServiceKind {
    pub fn default_port(self) -> u16 {
        match self {
            ServiceKind::Web => 2784,
            ServiceKind::Relay => 3000,
        }
    }

    pub fn default_program(self) -> PathBuf {
        match self {
            ServiceKind::Web => PathBuf::from("/usr/local/libexec/www-handler"),
            ServiceKind::Relay => PathBuf::from("/usr/local/libexec/relay-handler"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Web => "web",
            ServiceKind::Relay => "relay",
        }
    }
}

/// Root configuration for a dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Listening socket settings.
    pub listener: ListenerConfig,

    /// Source-network filter.
    pub access: AccessConfig,

    /// Handler program and argument template.
    pub handler: HandlerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl DispatcherConfig {
    /// Defaults for the given service, before any file or CLI overrides.
    pub fn for_service(service: ServiceKind) -> Self {
        Self {
            listener: ListenerConfig {
                port: service.default_port(),
                ..ListenerConfig::default()
            },
            access: AccessConfig::default(),
            handler: HandlerConfig {
                service,
                program: service.default_program(),
                world: false,
            },
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::for_service(ServiceKind::Web)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address without port (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Listening port. 0 asks the OS for an ephemeral port.
    pub port: u16,

    /// Pending-connection queue length passed to listen(2).
    pub backlog: u32,

    /// Upper bound on one readiness wait; reaping runs at least this often.
    pub poll_interval_ms: u64,
}

impl ListenerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `bind_address:port`, bracketing IPv6 literals.
    pub fn socket_address(&self) -> String {
        if self.bind_address.contains(':') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: ServiceKind::Web.default_port(),
            backlog: 5,
            poll_interval_ms: 5_000,
        }
    }
}

/// Access filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Network prefixes whose peers are handed off. Everything else is closed.
    pub allow: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            allow: vec!["10.0.0.0/8".to_string()],
        }
    }
}

/// Handler process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Argument template to use.
    pub service: ServiceKind,

    /// Absolute path of the handler executable.
    pub program: PathBuf,

    /// Forward `-world` to web handlers.
    pub world: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            service: ServiceKind::Web,
            program: ServiceKind::Web.default_program(),
            world: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_defaults() {
        let web = DispatcherConfig::for_service(ServiceKind::Web);
        assert_eq!(web.listener.port, 2784);
        assert_eq!(web.listener.backlog, 5);
        assert_eq!(web.listener.poll_interval(), Duration::from_secs(5));
        assert_eq!(web.handler.service, ServiceKind::Web);

        let relay = DispatcherConfig::for_service(ServiceKind::Relay);
        assert_eq!(relay.listener.port, 3000);
        assert_eq!(relay.handler.service, ServiceKind::Relay);
    }

    #[test]
    fn test_socket_address_brackets_ipv6() {
        let mut listener = ListenerConfig::default();
        assert_eq!(listener.socket_address(), "0.0.0.0:2784");

        listener.bind_address = "::".to_string();
        assert_eq!(listener.socket_address(), "[::]:2784");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: DispatcherConfig = toml::from_str(
            r#"
            [listener]
            port = 4000

            [access]
            allow = ["192.168.0.0/16"]

            [handler]
            service = "relay"
            program = "/srv/relay"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.listener.backlog, 5);
        assert_eq!(config.access.allow, vec!["192.168.0.0/16".to_string()]);
        assert_eq!(config.handler.service, ServiceKind::Relay);
        assert!(!config.handler.world);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }
}
