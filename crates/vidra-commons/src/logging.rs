//! Logging initialization for the service binaries.
//!
//! All crates log through the `log` facade; the binaries install an
//! `env_logger` backend configured from the service config. The
//! gateway's debug toggle flips the global max level at runtime
//! without touching per-module filters.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Install the `env_logger` backend.
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity per module without editing config files. Calling this
/// twice is harmless (the second init is ignored).
pub fn init_logging(level: &str) {
    let filter = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(filter.to_string()),
    )
    .format_timestamp_millis()
    .try_init();

    DEBUG_ENABLED.store(filter >= LevelFilter::Debug, Ordering::Relaxed);
}

/// Toggle debug logging at runtime (gateway `POST /debug`).
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    log::set_max_level(if enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}

/// Current state of the runtime debug toggle.
pub fn debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_toggle() {
        set_debug(true);
        assert!(debug_enabled());
        assert_eq!(log::max_level(), LevelFilter::Debug);
        set_debug(false);
        assert!(!debug_enabled());
        assert_eq!(log::max_level(), LevelFilter::Info);
    }
}
