//! Multi-signature custody model.
//!
//! Client-side mirror of the wallet contract state: the owner registry and
//! the append-only transaction sequence with its confirmation sets.
//!
//! # Data Flow
//! ```text
//! intent (propose / confirm / execute, signer)
//!     → owners.rs (is the signer an owner? is quorum met?)
//!     → ledger.rs (state transition + invariants)
//!     → WalletCall (network-bound intent for the submission driver)
//! ```
//!
//! # Transaction States
//! ```text
//! Proposed ──confirm──▶ Proposed (count + 1)
//!     │
//!     └── count >= threshold ──execute──▶ Executed (terminal)
//! ```
//!
//! Self-confirmation is never implicit: the proposer counts toward quorum
//! only after an explicit confirm.

pub mod amount;
pub mod error;
pub mod ledger;
pub mod owners;
pub mod transaction;

pub use amount::parse_amount;
pub use error::{MultisigError, MultisigResult};
pub use ledger::{Confirmation, Execution, Proposal, TransactionLedger};
pub use owners::OwnerSet;
pub use transaction::{Transaction, TransactionSnapshot, TransferIntent, WalletCall};
