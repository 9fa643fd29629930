//! Proposed transfers and the calls derived from them.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A proposed outgoing transfer held by the custody wallet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Position in the append-only sequence.
    pub index: u64,
    pub recipient: Address,
    /// Value in wei.
    pub amount: U256,
    /// Opaque call data forwarded with the transfer. May be empty.
    pub payload: Bytes,
    /// Owners who confirmed, in confirmation order, without duplicates.
    confirmations: Vec<Address>,
    executed: bool,
}

impl Transaction {
    pub(crate) fn new(index: u64, recipient: Address, amount: U256, payload: Bytes) -> Self {
        Self {
            index,
            recipient,
            amount,
            payload,
            confirmations: Vec::new(),
            executed: false,
        }
    }

    pub fn confirmations(&self) -> &[Address] {
        &self.confirmations
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }

    pub fn is_confirmed_by(&self, owner: &Address) -> bool {
        self.confirmations.contains(owner)
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Returns false if `owner` had already confirmed.
    pub(crate) fn add_confirmation(&mut self, owner: Address) -> bool {
        if self.is_confirmed_by(&owner) {
            return false;
        }
        self.confirmations.push(owner);
        true
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
    }

    /// The value transfer this transaction realizes when executed.
    pub fn transfer_intent(&self) -> TransferIntent {
        TransferIntent {
            recipient: self.recipient,
            amount: self.amount,
            payload: self.payload.clone(),
        }
    }
}

/// Chain-observed state of one wallet transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSnapshot {
    pub recipient: Address,
    pub amount: U256,
    pub payload: Bytes,
    pub executed: bool,
    /// Owners for which `isConfirmed(index, owner)` is true.
    pub confirmed_by: Vec<Address>,
}

impl TransactionSnapshot {
    pub(crate) fn into_transaction(self, index: u64) -> Transaction {
        let mut confirmations = Vec::with_capacity(self.confirmed_by.len());
        for owner in self.confirmed_by {
            if !confirmations.contains(&owner) {
                confirmations.push(owner);
            }
        }
        Transaction {
            index,
            recipient: self.recipient,
            amount: self.amount,
            payload: self.payload,
            confirmations,
            executed: self.executed,
        }
    }
}

/// Value transfer produced by a successful execution.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferIntent {
    pub recipient: Address,
    pub amount: U256,
    pub payload: Bytes,
}

/// Contract call that realizes a ledger transition on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletCall {
    Submit {
        recipient: Address,
        amount: U256,
        payload: Bytes,
    },
    Confirm {
        index: u64,
    },
    Execute {
        index: u64,
    },
}

impl WalletCall {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            WalletCall::Submit { .. } => "propose",
            WalletCall::Confirm { .. } => "confirm",
            WalletCall::Execute { .. } => "execute",
        }
    }
}
