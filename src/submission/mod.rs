//! Submission driver subsystem.
//!
//! # Data Flow
//! ```text
//! Intent (deploy / transfer / wallet call) + signer
//!     → driver.rs (per-signer lock, fresh nonce, gas, sign, broadcast)
//!     → classify.rs (rejections: recoverable hash / duplicate / stale / fatal)
//!     → driver.rs (bounded receipt wait, cancellable)
//!     → Receipt | SubmissionError
//! ```
//!
//! # Design Decisions
//! - One operation in flight per signer; different signers run concurrently
//! - Nonce is read from the network for every submission, never counted locally
//! - An unresolved previous operation blocks the signer until its receipt is seen
//! - Included-but-reverted operations resolve to a receipt, not an error

pub mod classify;
pub mod driver;
pub mod intent;
pub mod policy;
pub mod types;

pub use classify::{classify_failure, FailureClass};
pub use driver::{SubmissionDriver, SubmitOptions};
pub use intent::{Intent, IntentKind};
pub use policy::{GasPriceSource, SubmissionPolicy};
pub use types::{SubmissionError, SubmissionRecord, SubmissionResult, SubmissionStatus};
