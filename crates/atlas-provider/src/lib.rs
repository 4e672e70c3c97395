//! Process assembly for the Atlas organization provider.
//!
//! - [`config`] loads `atlas-provider.toml` plus `ATLAS__*` environment overrides.
//! - [`observability`] installs the tracing subscriber.
//! - [`DefaultClientFactory`] wires the HTTP organization client and the
//!   Secrets Manager store into a [`atlas_reconciler::Connector`].
//!
//! [`bootstrap`] runs all three in order and is what a driver process calls
//! at startup.

pub mod config;
mod factory;
pub mod observability;

pub use config::loader::load_config;
pub use config::{AppConfig, ConfigError};
pub use factory::{DefaultClientFactory, build_connector};

use atlas_reconciler::Connector;

/// Loads configuration, initialises tracing at the configured level and
/// builds the connector.
///
/// # Errors
///
/// Returns the [`ConfigError`] of loading or validating the configuration.
pub fn bootstrap(path: Option<&str>) -> Result<(AppConfig, Connector), ConfigError> {
    let config = load_config(path)?;
    observability::init_tracing(&config.logging);
    let connector = build_connector(&config);
    Ok((config, connector))
}
