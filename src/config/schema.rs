//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the custody
//! runner. Every section has defaults so a minimal file only names what differs.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::blockchain::types::NonceSource;
use crate::blockchain::wallet::OWNER_KEY_ENV_PREFIX;
use crate::submission::policy::{DEFAULT_GAS_HEADROOM, DEFAULT_TRANSFER_GAS_LIMIT};

/// Recipient used by the sample flow when none is configured.
pub const DEFAULT_RECIPIENT: Address = address!("23618e81E3f5cdF7f54C3d65f7FBc0aBf5B21E8f");

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CustodyConfig {
    /// Ledger endpoint settings.
    pub network: NetworkConfig,

    /// Nonce, gas and receipt handling.
    pub submission: SubmissionConfig,

    /// Wallet contract and owner keys.
    pub wallet: WalletConfig,

    /// The end-to-end proposal flow.
    pub flow: FlowConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ledger network configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID (e.g., 1337 for Ganache, 31337 for Anvil).
    pub chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Blocks on top of the including block before a receipt counts.
    pub confirmation_blocks: u32,

    /// Upper bound of the receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            rpc_timeout_secs: 10,
            confirmation_blocks: 0,
            poll_interval_ms: 1_000,
        }
    }
}

/// Submission policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SubmissionConfig {
    /// `latest` (mined count) or `pending` (including mempool).
    pub nonce_source: NonceSource,

    /// Gas budget for contract calls; derived from the block limit if unset.
    pub gas_limit: Option<u64>,

    /// Subtracted from the block gas limit when deriving the budget.
    pub gas_headroom: u64,

    /// Gas budget for plain value transfers.
    pub transfer_gas_limit: u64,

    /// Gas price multiplier (1.0 = node price, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Fixed gas price in wei; replaces the node's price when set.
    pub fixed_gas_price_wei: Option<u64>,

    /// Bound on waiting for a receipt.
    pub receipt_timeout_secs: u64,

    /// Receipt lookups for an operation recovered from a rejection.
    pub receipt_lookup_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub lookup_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub lookup_max_delay_ms: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            nonce_source: NonceSource::Latest,
            gas_limit: None,
            gas_headroom: DEFAULT_GAS_HEADROOM,
            transfer_gas_limit: DEFAULT_TRANSFER_GAS_LIMIT,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
            fixed_gas_price_wei: None,
            receipt_timeout_secs: 120,
            receipt_lookup_attempts: 5,
            lookup_base_delay_ms: 200,
            lookup_max_delay_ms: 2_000,
        }
    }
}

/// Wallet contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalletConfig {
    /// Confirmations required before execution.
    pub threshold: usize,

    /// Compiled contract `{abi, bytecode}` JSON.
    pub artifact_path: String,

    /// Attach to this deployed wallet instead of deploying.
    pub contract_address: Option<Address>,

    /// Owner keys are read from `<prefix>1`, `<prefix>2`, ...
    pub owner_key_env_prefix: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            threshold: 1,
            artifact_path: "build/MultiSigWallet.json".to_string(),
            contract_address: None,
            owner_key_env_prefix: OWNER_KEY_ENV_PREFIX.to_string(),
        }
    }
}

/// End-to-end flow configuration. Owners are referred to by their
/// zero-based position in the key list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlowConfig {
    /// Value sent from `funder` to the wallet before proposing.
    pub funding_amount: String,

    pub funder: usize,

    pub recipient: Address,

    /// Value of the proposed transfer.
    pub amount: String,

    /// Hex call data attached to the proposal.
    pub payload: String,

    pub proposer: usize,

    /// Owners confirming, in order.
    pub confirmers: Vec<usize>,

    pub executor: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            funding_amount: "0.01 ether".to_string(),
            funder: 0,
            recipient: DEFAULT_RECIPIENT,
            amount: "0.002 ether".to_string(),
            payload: String::new(),
            proposer: 0,
            confirmers: vec![1],
            executor: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Metrics endpoint bind address; no exporter when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
