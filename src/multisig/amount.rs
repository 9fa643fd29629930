//! Transfer amount parsing.
//!
//! Accepts `"<integer>"` / `"<integer> wei"` in the ledger's base unit and
//! `"<decimal> ether"` / `"<decimal> eth"`. Negative values are rejected.

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;

use crate::multisig::error::{MultisigError, MultisigResult};

pub fn parse_amount(input: &str) -> MultisigResult<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(MultisigError::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(MultisigError::InvalidAmount(format!(
            "amount must not be negative: {}",
            trimmed
        )));
    }

    let (number, unit) = match trimmed.split_once(char::is_whitespace) {
        Some((number, unit)) => (number.trim(), unit.trim().to_ascii_lowercase()),
        None => (trimmed, "wei".to_string()),
    };

    let parsed = match unit.as_str() {
        "wei" => U256::from_str_radix(number, 10).map_err(|e| e.to_string()),
        "eth" | "ether" => parse_ether(number).map_err(|e| e.to_string()),
        other => Err(format!("unknown unit '{}'", other)),
    };

    parsed.map_err(|e| MultisigError::InvalidAmount(format!("'{}': {}", trimmed, e)))
}
