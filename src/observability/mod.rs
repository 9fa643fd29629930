//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Ledger mirror, submission driver, custody flow:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
