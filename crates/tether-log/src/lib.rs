//! Structured logging for the simulation runtime.
//!
//! Console output via the `tracing` ecosystem: timestamps, module paths,
//! severity, environment-based filtering (respects `RUST_LOG`), and a
//! config-driven default level.

use tether_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber.
///
/// The filter comes from, in order of precedence: the `RUST_LOG`
/// environment variable, the config's `debug.log_level`, then the built-in
/// default. Safe to call once per process; later calls are no-ops.
pub fn init_logging(config: Option<&Config>) {
    let filter_str = config
        .map(|c| c.debug.log_level.as_str())
        .filter(|level| !level.is_empty())
        .unwrap_or("info");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// The filter used when neither `RUST_LOG` nor the config say otherwise.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info")
}
