//! Orchestration of the custody protocol.
//!
//! # Data Flow
//! ```text
//! orchestrator.rs (step ordering, funding, reporting)
//!     → session.rs (stage on ledger mirror, send, commit or resync)
//!         → multisig::TransactionLedger (local invariants)
//!         → contract::WalletContract (remote calls and views)
//! ```

pub mod orchestrator;
pub mod session;

pub use orchestrator::{CustodyFlow, FlowPlan, FlowReport, WalletSource};
pub use session::WalletSession;
