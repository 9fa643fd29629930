//! Submission outcomes and errors.

use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use thiserror::Error;

use crate::blockchain::types::{BlockchainError, LedgerFailure};

#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    /// No receipt within the bound. The signer stays blocked until the
    /// operation resolves.
    #[error("no receipt for {hash} after {waited:?}")]
    Timeout { hash: TxHash, waited: Duration },

    #[error("operation from {signer} with nonce {nonce} rejected: {reason}")]
    RejectedFatal {
        signer: Address,
        nonce: u64,
        reason: LedgerFailure,
    },

    /// A previous operation from this signer has not resolved.
    #[error("signer {signer} has unresolved operation {hash} at nonce {nonce}")]
    NonceInFlight {
        signer: Address,
        nonce: u64,
        hash: TxHash,
    },

    /// The network's count is not past the last nonce this signer used.
    #[error("nonce {nonce} for {signer} is not past the last used nonce {last}")]
    StaleNonce { signer: Address, nonce: u64, last: u64 },

    #[error("submission cancelled")]
    Cancelled { hash: Option<TxHash> },

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
}

pub type SubmissionResult<T> = Result<T, SubmissionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Broadcast, receipt not seen yet.
    Pending,
    /// Included and succeeded.
    Confirmed,
    /// Rejected at submission but included; the receipt decides.
    RejectedBenign,
    RejectedFatal,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Confirmed => "confirmed",
            SubmissionStatus::RejectedBenign => "rejected_benign",
            SubmissionStatus::RejectedFatal => "rejected_fatal",
        }
    }
}

/// Last submission made for a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub intent: &'static str,
    pub signer: Address,
    pub nonce: u64,
    pub hash: TxHash,
    pub status: SubmissionStatus,
}

impl SubmissionRecord {
    pub fn is_unresolved(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}
