//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → pending receipt waits return Cancelled → flow stops
//! ```
//!
//! # Design Decisions
//! - Cancellation stops waiting, never the ledger: a broadcast operation may
//!   still be included after the process gives up on it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::spawn_ctrl_c_handler;
