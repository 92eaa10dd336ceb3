//! Tracing setup for the binary
//!
//! Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
//! wins over the `log_level` setting.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::settings::Settings;

/// Install the global subscriber. Later calls are ignored.
pub fn init(settings: &Settings, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { settings.log_level.as_str() };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
