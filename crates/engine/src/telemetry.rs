//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events under the `causeway::*` targets.
//! Binaries and test harnesses call [`init_tracing`] once to see them.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `config.level`
///
/// Returns `false` if a global subscriber was already installed (the call is
/// then a no-op) or if the level string cannot be parsed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let env_filter = match EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
    {
        Ok(filter) => filter,
        Err(_) => return false,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(config.ansi);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(target: "causeway::session", level = %config.level, "Tracing initialized");
    }
    installed
}
