//! Owner signing keys.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Default environment variable prefix for owner keys (`CUSTODY_OWNER_KEY_1`, ...).
pub const OWNER_KEY_ENV_PREFIX: &str = "CUSTODY_OWNER_KEY_";

/// Signing key of one wallet owner.
#[derive(Debug, Clone)]
pub struct OwnerKey {
    signer: PrivateKeySigner,
}

impl OwnerKey {
    /// Create a key from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::debug!(address = %signer.address(), "Owner key loaded");

        Ok(Self { signer })
    }

    /// Load a key from the named environment variable.
    pub fn from_env(var: &str) -> BlockchainResult<Self> {
        let private_key = std::env::var(var).map_err(|_| {
            BlockchainError::Wallet(format!("Environment variable {} not set", var))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Load `<prefix>1`, `<prefix>2`, ... until the first unset variable.
    pub fn all_from_env(prefix: &str) -> BlockchainResult<Vec<Self>> {
        let mut keys = Vec::new();
        for i in 1.. {
            let var = format!("{}{}", prefix, i);
            if std::env::var_os(&var).is_none() {
                break;
            }
            keys.push(Self::from_env(&var)?);
        }
        Ok(keys)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Network wallet used to sign transaction envelopes.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}
