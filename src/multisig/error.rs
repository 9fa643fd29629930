//! Errors raised by the local custody model.
//!
//! Everything except `Configuration` signals a caller logic error and must
//! not be retried.

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MultisigError {
    /// Owner set or threshold rejected at construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Signer not authorized: {0}")]
    UnauthorizedSigner(Address),

    #[error("Unknown transaction index {0}")]
    UnknownTransaction(u64),

    #[error("Transaction {0} already executed")]
    AlreadyExecuted(u64),

    #[error("Quorum not met: have {have} confirmations, need {need}")]
    QuorumNotMet { have: usize, need: usize },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Result type for custody model operations.
pub type MultisigResult<T> = Result<T, MultisigError>;
