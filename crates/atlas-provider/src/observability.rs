//! Tracing subscriber with a log level that can be changed at runtime.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> = OnceLock::new();

/// Installs the global subscriber. `RUST_LOG`, when set and valid, wins over
/// the configured level.
///
/// Returns `false` if a subscriber was already installed; the configured
/// level is then applied through the existing reload handle, if any.
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(&logging.level));

    let (reload_layer, handle) = reload::Layer::new(filter);
    if LOG_RELOAD_HANDLE.set(handle).is_err() {
        apply_logging_level(&logging.level);
        return false;
    }

    let installed = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(level = %logging.level, "tracing initialised");
    }
    installed
}

/// Replaces the active filter. Returns `false` before [`init_tracing`] has
/// run or when `level` is not a valid filter directive.
pub fn apply_logging_level(level: &str) -> bool {
    let Some(handle) = LOG_RELOAD_HANDLE.get() else {
        return false;
    };
    let filter = match EnvFilter::try_new(level) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::warn!(level, error = %e, "ignoring invalid logging level");
            return false;
        }
    };
    match handle.modify(|f| *f = filter) {
        Ok(()) => {
            tracing::info!(level, "logging level changed");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to change logging level");
            false
        }
    }
}
