//! Multi-signature custody wallet client.
//!
//! A local model of proposal, confirmation and execution over a fixed owner
//! set, driven against an EVM ledger by a submission driver that keeps each
//! signer's nonce safe and resolves ambiguous rejections.

// Custody model
pub mod multisig;

// Ledger integration
pub mod blockchain;
pub mod contract;
pub mod submission;

// Orchestration
pub mod flow;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use blockchain::{BlockchainClient, LedgerClient};
pub use config::CustodyConfig;
pub use error::{CustodyError, CustodyResult};
pub use flow::{CustodyFlow, FlowPlan, FlowReport, WalletSource};
pub use lifecycle::Shutdown;
pub use submission::{SubmissionDriver, SubmissionPolicy};
