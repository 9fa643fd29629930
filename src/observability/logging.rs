//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("multisig_custody={}", config.log_level)));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
