//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! custody.toml
//!     → loader.rs (parse, CUSTODY_RPC_URL override)
//!     → validation.rs (semantic checks, all errors at once)
//!     → CustodyConfig (validated, immutable)
//!
//! CUSTODY_OWNER_KEY_1..N
//!     → loader.rs (owner keys, at least two)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Secrets never live in the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_owner_keys, ConfigError};
pub use schema::{
    CustodyConfig, FlowConfig, NetworkConfig, ObservabilityConfig, SubmissionConfig, WalletConfig,
};
pub use validation::{validate_config, validate_flow_owners, ValidationError};
