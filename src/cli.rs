//! Command-line surface of the two dispatcher binaries.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser};

use crate::config::{load_config, validate_config, ConfigError, DispatcherConfig, ServiceKind};

/// Options shared by both dispatchers. Each one overrides the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ServiceArgs {
    /// TOML configuration file layered over the service defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listening port
    #[arg(long)]
    pub port: Option<u16>,

    /// Allowed source network, e.g. 10.0.0.0/8 (repeatable)
    #[arg(long = "allow", value_name = "PREFIX")]
    pub allow: Vec<String>,

    /// Absolute path of the handler program
    #[arg(long, value_name = "PATH")]
    pub handler: Option<PathBuf>,
}

impl ServiceArgs {
    /// Defaults, then the config file, then flags; validated last.
    pub fn resolve(&self, service: ServiceKind, world: bool) -> Result<DispatcherConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path, service)?,
            None => DispatcherConfig::for_service(service),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if !self.allow.is_empty() {
            config.access.allow = self.allow.clone();
        }
        if let Some(handler) = &self.handler {
            config.handler.program = handler.clone();
        }
        if world {
            config.handler.world = true;
        }

        validate_config(&config, service).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[derive(Debug, Parser)]
#[command(name = "www-dispatch")]
#[command(about = "Hands web connections from allowed networks to the web handler", long_about = None)]
pub struct WebCli {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Run spawned handlers in world mode (forwarded as -world)
    #[arg(long)]
    pub world: bool,
}

#[derive(Debug, Parser)]
#[command(name = "relay-dispatch")]
#[command(about = "Hands relay connections from allowed networks to the relay handler", long_about = None)]
pub struct RelayCli {
    #[command(flatten)]
    pub service: ServiceArgs,
}

/// Parse `args`, or print clap's message and return the exit code to use.
pub fn parse_args<C: Parser>(args: Vec<OsString>) -> Result<C, ExitCode> {
    C::try_parse_from(args).map_err(|err| {
        let _ = err.print();
        ExitCode::from(usage_exit_status(&err))
    })
}

/// `--help` and `--version` succeed; any other parse failure is a fatal
/// startup error like a bad config file.
pub fn usage_exit_status(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

/// Accept the historical single-dash `-world` spelling.
pub fn normalize_world_flag<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| if arg == "-world" { OsString::from("--world") } else { arg })
        .collect()
}
