//! Configuration loading.
//!
//! Sources, later ones winning: built-in defaults, an optional file
//! (format from its extension), then `QRSLOT__*` environment variables
//! with `__` between nested keys, e.g. `QRSLOT__PANEL__CLIENT_ID`.

use std::path::Path;

use config::{Config, Environment, File};
use qrslot_domain::{AppConfig, DomainError};
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "QRSLOT";

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Values parsed but are out of range.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] DomainError),
}

/// Loads configuration from `path` (if given) and the process environment.
///
/// # Errors
/// [`ConfigError::Load`] for unreadable or mistyped sources,
/// [`ConfigError::Invalid`] for values rejected by [`AppConfig::validate`].
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_with_env(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    let config: AppConfig = builder.add_source(env).build()?.try_deserialize()?;
    config.validate()?;
    tracing::debug!(
        panel_configured = config.panel.is_complete(),
        capacity = config.slots.capacity,
        "configuration loaded"
    );
    Ok(config)
}
