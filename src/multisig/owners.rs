//! Owner registry: the fixed signer set and confirmation threshold.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::multisig::error::{MultisigError, MultisigResult};

/// Authorized owners of a custody wallet plus the quorum threshold.
///
/// Immutable after construction; the deployed contract holds the same values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerSet {
    owners: Vec<Address>,
    threshold: usize,
}

impl OwnerSet {
    /// Create a new owner set.
    ///
    /// # Errors
    /// `Configuration` if `owners` is empty, contains duplicates or the zero
    /// address, or if `threshold` is outside `1..=owners.len()`.
    pub fn new(owners: Vec<Address>, threshold: usize) -> MultisigResult<Self> {
        if owners.is_empty() {
            return Err(MultisigError::Configuration(
                "owner set must not be empty".to_string(),
            ));
        }

        if threshold == 0 || threshold > owners.len() {
            return Err(MultisigError::Configuration(format!(
                "threshold {} outside 1..={}",
                threshold,
                owners.len()
            )));
        }

        if owners.iter().any(|owner| owner.is_zero()) {
            return Err(MultisigError::Configuration(
                "zero address cannot be an owner".to_string(),
            ));
        }

        let mut sorted = owners.clone();
        sorted.sort();
        if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(MultisigError::Configuration(
                "duplicate owner address".to_string(),
            ));
        }

        Ok(Self { owners, threshold })
    }

    /// True iff `identity` is one of the owners.
    pub fn validate(&self, identity: &Address) -> bool {
        self.owners.contains(identity)
    }

    /// True iff `confirmations` reaches the threshold.
    pub fn quorum_met(&self, confirmations: usize) -> bool {
        confirmations >= self.threshold
    }

    pub(crate) fn authorize(&self, identity: Address) -> MultisigResult<()> {
        if self.validate(&identity) {
            Ok(())
        } else {
            Err(MultisigError::UnauthorizedSigner(identity))
        }
    }

    /// Owners in registration order.
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Description like "2-of-3".
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }
}
