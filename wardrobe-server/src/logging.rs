//! Tracing setup
//!
//! The subscriber is installed before the configuration is read so that
//! config loading can log. It starts from `RUST_LOG` (or `info`); once the
//! configuration is loaded, `logging.level` replaces that filter unless
//! `RUST_LOG` was set.

use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Filter used until the configured level is known
pub const STARTUP_LEVEL: &str = "info";

pub type FilterLayer = reload::Layer<EnvFilter, Registry>;

/// Handle for swapping in the configured log level after startup
#[derive(Debug, Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogLevelHandle {
    /// Apply `logging.level` from the configuration
    ///
    /// Does nothing when `RUST_LOG` chose the filter. An unparsable level
    /// leaves the current filter in place.
    pub fn apply_configured_level(&self, level: &str) -> Result<(), String> {
        if self.env_override {
            return Ok(());
        }
        let filter = EnvFilter::try_new(level)
            .map_err(|e| format!("Invalid logging.level {:?}: {}", level, e))?;
        self.handle
            .reload(filter)
            .map_err(|e| format!("Failed to update log filter: {}", e))
    }
}

/// Reloadable filter layer built from `RUST_LOG` directives, if any
pub fn filter_layer(rust_log: Option<&str>) -> (FilterLayer, LogLevelHandle) {
    let from_env = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok());
    let env_override = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(STARTUP_LEVEL));

    let (layer, handle) = reload::Layer::new(filter);
    (
        layer,
        LogLevelHandle {
            handle,
            env_override,
        },
    )
}

/// Install the global subscriber (filter + fmt layer)
pub fn init() -> LogLevelHandle {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, handle) = filter_layer(rust_log.as_deref());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    handle
}
