//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and cross-field rules.
//! Returns every problem found, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{CustodyConfig, FlowConfig, NetworkConfig, ObservabilityConfig, SubmissionConfig, WalletConfig};
use crate::multisig::parse_amount;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Smallest budget that can carry a value transfer.
const MIN_TRANSFER_GAS: u64 = 21_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &CustodyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_network(&config.network, &mut errors);
    validate_submission(&config.submission, &mut errors);
    validate_wallet(&config.wallet, &mut errors);
    validate_flow(&config.flow, &mut errors);
    validate_observability(&config.observability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that every owner position named by the flow exists.
pub fn validate_flow_owners(flow: &FlowConfig, owner_count: usize) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut check = |field: &'static str, position: usize| {
        if position >= owner_count {
            errors.push(ValidationError::new(
                field,
                format!("owner {} does not exist, {} owner keys loaded", position, owner_count),
            ));
        }
    };

    check("flow.funder", flow.funder);
    check("flow.proposer", flow.proposer);
    check("flow.executor", flow.executor);
    for &confirmer in &flow.confirmers {
        check("flow.confirmers", confirmer);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_network(network: &NetworkConfig, errors: &mut Vec<ValidationError>) {
    if let Err(e) = url::Url::parse(&network.rpc_url) {
        errors.push(ValidationError::new("network.rpc_url", format!("invalid URL: {}", e)));
    }
    for failover in &network.failover_urls {
        if let Err(e) = url::Url::parse(failover) {
            errors.push(ValidationError::new(
                "network.failover_urls",
                format!("invalid URL '{}': {}", failover, e),
            ));
        }
    }
    if network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be greater than 0"));
    }
    if network.poll_interval_ms == 0 {
        errors.push(ValidationError::new("network.poll_interval_ms", "must be greater than 0"));
    }
}

fn validate_submission(submission: &SubmissionConfig, errors: &mut Vec<ValidationError>) {
    if submission.gas_limit == Some(0) {
        errors.push(ValidationError::new("submission.gas_limit", "must be greater than 0"));
    }
    if submission.transfer_gas_limit < MIN_TRANSFER_GAS {
        errors.push(ValidationError::new(
            "submission.transfer_gas_limit",
            format!("must be at least {}", MIN_TRANSFER_GAS),
        ));
    }
    if !submission.gas_price_multiplier.is_finite() || submission.gas_price_multiplier <= 0.0 {
        errors.push(ValidationError::new(
            "submission.gas_price_multiplier",
            "must be a positive number",
        ));
    }
    if submission.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new("submission.receipt_timeout_secs", "must be greater than 0"));
    }
    if submission.receipt_lookup_attempts == 0 {
        errors.push(ValidationError::new("submission.receipt_lookup_attempts", "must be at least 1"));
    }
    if submission.lookup_base_delay_ms > submission.lookup_max_delay_ms {
        errors.push(ValidationError::new(
            "submission.lookup_base_delay_ms",
            "must not exceed lookup_max_delay_ms",
        ));
    }
}

fn validate_wallet(wallet: &WalletConfig, errors: &mut Vec<ValidationError>) {
    if wallet.threshold == 0 {
        errors.push(ValidationError::new("wallet.threshold", "must be at least 1"));
    }
    if wallet.contract_address.is_none() && wallet.artifact_path.trim().is_empty() {
        errors.push(ValidationError::new(
            "wallet.artifact_path",
            "required when no contract_address is configured",
        ));
    }
    if wallet.owner_key_env_prefix.trim().is_empty() {
        errors.push(ValidationError::new("wallet.owner_key_env_prefix", "must not be empty"));
    }
}

fn validate_flow(flow: &FlowConfig, errors: &mut Vec<ValidationError>) {
    if let Err(e) = parse_amount(&flow.funding_amount) {
        errors.push(ValidationError::new("flow.funding_amount", e.to_string()));
    }
    if let Err(e) = parse_amount(&flow.amount) {
        errors.push(ValidationError::new("flow.amount", e.to_string()));
    }
    if let Err(e) = alloy::hex::decode(flow.payload.trim()) {
        errors.push(ValidationError::new("flow.payload", format!("invalid hex: {}", e)));
    }
}

fn validate_observability(observability: &ObservabilityConfig, errors: &mut Vec<ValidationError>) {
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", observability.log_level),
        ));
    }
    if let Some(addr) = &observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("invalid socket address '{}'", addr),
            ));
        }
    }
}
