//! Crate-level error type for the custody flow.

use alloy::primitives::{Address, TxHash};
use thiserror::Error;

use crate::blockchain::types::BlockchainError;
use crate::config::loader::ConfigError;
use crate::multisig::MultisigError;
use crate::submission::types::SubmissionError;

#[derive(Debug, Error)]
pub enum CustodyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Multisig(#[from] MultisigError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    /// The operation was included but reverted on the ledger.
    #[error("{step} reverted on the ledger in {hash}")]
    Reverted { step: &'static str, hash: TxHash },

    /// The receipt lacks an event the step depends on.
    #[error("receipt {hash} has no {event} event")]
    MissingEvent { event: &'static str, hash: TxHash },

    #[error("Artifact error: {0}")]
    Artifact(String),

    /// The attached wallet requires a different number of confirmations.
    #[error("wallet requires {on_chain} confirmations, configured {configured}")]
    ThresholdMismatch { on_chain: usize, configured: usize },

    /// A configured owner is not an owner of the attached wallet.
    #[error("{owner} is not an owner of wallet {wallet}")]
    OwnerMismatch { wallet: Address, owner: Address },
}

pub type CustodyResult<T> = Result<T, CustodyError>;
