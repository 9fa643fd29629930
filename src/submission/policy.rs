//! Submission policy: nonce source, gas budget and gas price source.
//!
//! Built once from configuration and handed to the driver.

use std::time::Duration;

use crate::blockchain::types::{BlockchainError, BlockchainResult, NetworkConfig, NonceSource};
use crate::config::schema::SubmissionConfig;

/// Gas left between the derived budget and the block gas limit.
pub const DEFAULT_GAS_HEADROOM: u64 = 5_000;

/// Budget for plain value transfers.
pub const DEFAULT_TRANSFER_GAS_LIMIT: u64 = 210_000;

const WEI_PER_GWEI: u128 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum GasPriceSource {
    /// Node's price times `multiplier`; the adjusted price is refused above `max_gwei`.
    Network { multiplier: f64, max_gwei: u64 },
    /// Constant price in wei.
    Fixed(u128),
}

impl GasPriceSource {
    /// Final price for a submission given the node's current price.
    pub fn resolve(&self, network_price: u128) -> BlockchainResult<u128> {
        match *self {
            GasPriceSource::Fixed(price) => Ok(price),
            GasPriceSource::Network {
                multiplier,
                max_gwei,
            } => {
                let adjusted = (network_price as f64 * multiplier) as u128;
                let gas_price_gwei = adjusted / WEI_PER_GWEI;
                if gas_price_gwei > max_gwei as u128 {
                    return Err(BlockchainError::GasPriceTooHigh {
                        current_gwei: u64::try_from(gas_price_gwei).unwrap_or(u64::MAX),
                        max_gwei,
                    });
                }
                Ok(adjusted)
            }
        }
    }

    pub fn needs_network(&self) -> bool {
        matches!(self, GasPriceSource::Network { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPolicy {
    pub nonce_source: NonceSource,
    /// Contract-call budget; derived from the block gas limit when `None`.
    pub gas_limit: Option<u64>,
    pub gas_headroom: u64,
    pub transfer_gas_limit: u64,
    pub gas_price: GasPriceSource,
    /// Expected chain id; checked once before the first signature.
    pub chain_id: Option<u64>,
    /// Default bound on waiting for inclusion.
    pub receipt_timeout: Duration,
    /// Receipt lookups after recovering an identifier from a rejection.
    pub lookup_attempts: u32,
    pub lookup_base_delay_ms: u64,
    pub lookup_max_delay_ms: u64,
}

impl SubmissionPolicy {
    pub fn from_config(submission: &SubmissionConfig, network: &NetworkConfig) -> Self {
        let gas_price = match submission.fixed_gas_price_wei {
            Some(price) => GasPriceSource::Fixed(price as u128),
            None => GasPriceSource::Network {
                multiplier: submission.gas_price_multiplier,
                max_gwei: submission.max_gas_price_gwei,
            },
        };

        Self {
            nonce_source: submission.nonce_source,
            gas_limit: submission.gas_limit,
            gas_headroom: submission.gas_headroom,
            transfer_gas_limit: submission.transfer_gas_limit,
            gas_price,
            chain_id: network.chain_id,
            receipt_timeout: Duration::from_secs(submission.receipt_timeout_secs),
            lookup_attempts: submission.receipt_lookup_attempts,
            lookup_base_delay_ms: submission.lookup_base_delay_ms,
            lookup_max_delay_ms: submission.lookup_max_delay_ms,
        }
    }

    /// Budget derived from the block gas limit.
    pub fn derive_gas_limit(&self, block_gas_limit: u64) -> u64 {
        block_gas_limit.saturating_sub(self.gas_headroom)
    }
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self::from_config(&SubmissionConfig::default(), &NetworkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = SubmissionPolicy::default();
        assert_eq!(policy.nonce_source, NonceSource::Latest);
        assert_eq!(policy.gas_limit, None);
        assert_eq!(policy.gas_headroom, DEFAULT_GAS_HEADROOM);
        assert_eq!(policy.transfer_gas_limit, DEFAULT_TRANSFER_GAS_LIMIT);
        assert!(policy.gas_price.needs_network());
        assert!(policy.receipt_timeout > Duration::ZERO);
    }

    #[test]
    fn test_derive_gas_limit_stays_below_block_limit() {
        let policy = SubmissionPolicy::default();
        assert_eq!(policy.derive_gas_limit(6_721_975), 6_716_975);
        assert_eq!(policy.derive_gas_limit(1_000), 0);
    }

    #[test]
    fn test_network_price_multiplier() {
        let source = GasPriceSource::Network {
            multiplier: 1.5,
            max_gwei: 100,
        };
        assert_eq!(source.resolve(20 * WEI_PER_GWEI).unwrap(), 30 * WEI_PER_GWEI);
    }

    #[test]
    fn test_network_price_ceiling() {
        let source = GasPriceSource::Network {
            multiplier: 1.0,
            max_gwei: 50,
        };
        let err = source.resolve(51 * WEI_PER_GWEI).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::GasPriceTooHigh {
                current_gwei: 51,
                max_gwei: 50
            }
        ));
    }

    #[test]
    fn test_ceiling_applies_after_multiplier() {
        let source = GasPriceSource::Network {
            multiplier: 2.0,
            max_gwei: 50,
        };
        // 30 gwei from the node is under the ceiling, 60 gwei after adjustment is not.
        let err = source.resolve(30 * WEI_PER_GWEI).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::GasPriceTooHigh {
                current_gwei: 60,
                max_gwei: 50
            }
        ));
        assert_eq!(source.resolve(25 * WEI_PER_GWEI).unwrap(), 50 * WEI_PER_GWEI);
    }

    #[test]
    fn test_fixed_price_ignores_network() {
        let mut config = SubmissionConfig::default();
        config.fixed_gas_price_wei = Some(1_000);
        let policy = SubmissionPolicy::from_config(&config, &NetworkConfig::default());
        assert_eq!(policy.gas_price, GasPriceSource::Fixed(1_000));
        assert_eq!(policy.gas_price.resolve(u128::MAX).unwrap(), 1_000);
    }
}
