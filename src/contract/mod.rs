//! Wallet contract integration.
//!
//! # Data Flow
//! ```text
//! artifact.rs ({abi, bytecode} record from the external compiler)
//!     → handle.rs (deploy / attach, remote propose / confirm / execute)
//!     → bindings.rs (ABI encoding of calls, decoding of events and views)
//! ```

pub mod artifact;
pub mod bindings;
pub mod handle;

pub use artifact::ContractArtifact;
pub use bindings::{encode_constructor_args, encode_wallet_call, IMultiSigWallet};
pub use handle::{WalletContract, WalletStatus};
