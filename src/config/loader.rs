//! Configuration loading from disk.
//!
//! A file only needs the keys it changes: it is layered over the defaults
//! of the service the binary fronts, so a relay config without a `port`
//! still listens on the relay port.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{DispatcherConfig, ServiceKind};
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Default serialization failed: {0}")]
    Defaults(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Read a TOML file over the defaults of `service`.
///
/// Validation is left to the caller so command-line overrides can be
/// applied first.
pub fn load_config(path: &Path, service: ServiceKind) -> Result<DispatcherConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, service)
}

/// Parse TOML text over the defaults of `service`. Does not validate.
pub fn parse_config(content: &str, service: ServiceKind) -> Result<DispatcherConfig, ConfigError> {
    let mut base = toml::Table::try_from(DispatcherConfig::for_service(service))?;
    let overlay: toml::Table = toml::from_str(content)?;
    merge_tables(&mut base, overlay);
    Ok(base.try_into()?)
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
