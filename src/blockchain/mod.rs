//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (owner keys, RPC URL)
//!     → wallet.rs (key loading)
//!     → client.rs (LedgerClient: RPC reads with timeouts, signing, broadcast)
//!     → submission driver (nonce, gas, receipt resolution)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod types;
pub mod wallet;

pub use client::{BlockchainClient, LedgerClient};
pub use types::{
    BlockchainError, BlockchainResult, ChainId, LedgerFailure, NetworkConfig, NonceSource,
    Operation, Receipt, SignedOperation,
};
pub use wallet::OwnerKey;
