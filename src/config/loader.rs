//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::blockchain::types::BlockchainError;
use crate::blockchain::wallet::OwnerKey;
use crate::config::schema::{CustodyConfig, WalletConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `network.rpc_url`.
pub const RPC_URL_ENV: &str = "CUSTODY_RPC_URL";

/// Fewest owner keys a wallet can be run with.
pub const MIN_OWNER_KEYS: usize = 2;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Missing environment: {0}")]
    MissingEnv(String),

    #[error("Owner key error: {0}")]
    Key(#[from] BlockchainError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment and validate a TOML file.
pub fn load_config(path: &Path) -> Result<CustodyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: CustodyConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::info!(
        path = %path.display(),
        rpc_url = %config.network.rpc_url,
        threshold = config.wallet.threshold,
        "Configuration loaded"
    );
    Ok(config)
}

pub fn apply_env_overrides(config: &mut CustodyConfig) {
    if let Ok(url) = std::env::var(RPC_URL_ENV) {
        if !url.trim().is_empty() {
            tracing::debug!(rpc_url = %url, "RPC URL taken from environment");
            config.network.rpc_url = url.trim().to_string();
        }
    }
}

/// Owner keys in order, from `<prefix>1` upwards.
pub fn load_owner_keys(wallet: &WalletConfig) -> Result<Vec<OwnerKey>, ConfigError> {
    let keys = OwnerKey::all_from_env(&wallet.owner_key_env_prefix)?;
    if keys.len() < MIN_OWNER_KEYS {
        return Err(ConfigError::MissingEnv(format!(
            "at least {} owner keys required ({}1, {}2, ...), found {}",
            MIN_OWNER_KEYS,
            wallet.owner_key_env_prefix,
            wallet.owner_key_env_prefix,
            keys.len()
        )));
    }

    tracing::info!(owners = keys.len(), "Owner keys loaded");
    Ok(keys)
}
