//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Receipt polling (client) and receipt recovery (driver):
//!     → backoff.rs (exponential delay with jitter)
//!     → retries.rs (bounded polling until a value appears)
//! ```

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::poll_until_some;
