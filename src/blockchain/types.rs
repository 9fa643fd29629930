//! Chain-specific types and error definitions.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export NetworkConfig from config module to avoid duplication
pub use crate::config::schema::NetworkConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Rejection reported by the network, normalized from the JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerFailure {
    /// Textual form of the error.
    pub message: String,
    /// Structured `data` member of the JSON-RPC error, if any.
    pub data: Option<serde_json::Value>,
}

impl LedgerFailure {
    pub fn new(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        Self::new(message, None)
    }
}

impl std::fmt::Display for LedgerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{} (data: {})", self.message, data),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The network rejected a submitted operation.
    #[error("Rejected by network: {0}")]
    Rejected(LedgerFailure),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Contract return data could not be decoded.
    #[error("ABI error: {0}")]
    Abi(String),
}

impl BlockchainError {
    /// View this error as a network failure payload for classification.
    pub fn to_failure(&self) -> LedgerFailure {
        match self {
            BlockchainError::Rejected(failure) => failure.clone(),
            other => LedgerFailure::from_message(other.to_string()),
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Which transaction count to treat as the signer's next nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceSource {
    /// Count of mined transactions.
    #[default]
    Latest,
    /// Count including the node's mempool.
    Pending,
}

/// Fully-specified unsigned operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub from: Address,
    /// `None` creates a contract from `input`.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

impl Operation {
    /// Legacy-priced transaction request for this operation.
    pub fn to_request(&self) -> TransactionRequest {
        let request = TransactionRequest::default()
            .with_from(self.from)
            .with_value(self.value)
            .with_nonce(self.nonce)
            .with_gas_limit(self.gas_limit)
            .with_gas_price(self.gas_price)
            .with_chain_id(self.chain_id);

        match self.to {
            Some(to) => request.with_to(to).with_input(self.input.clone()),
            None => request.with_deploy_code(self.input.clone()),
        }
    }
}

/// Signed operation ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedOperation {
    /// Identifier the network will assign.
    pub hash: TxHash,
    /// EIP-2718 encoded transaction.
    pub raw: Bytes,
    pub operation: Operation,
}

/// The network's record of an included operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    /// False when the operation was included but reverted.
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub contract_address: Option<Address>,
    pub logs: Vec<Log>,
}
