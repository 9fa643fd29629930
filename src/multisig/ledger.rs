//! Transaction ledger: the authoritative local record of proposals,
//! confirmations and executions.
//!
//! Every operation validates in a fixed order (authorization, index,
//! execution state, quorum) and either mutates the ledger and returns the
//! derived [`WalletCall`], or fails without touching state.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::multisig::error::{MultisigError, MultisigResult};
use crate::multisig::owners::OwnerSet;
use crate::multisig::transaction::{Transaction, TransactionSnapshot, TransferIntent, WalletCall};
use crate::observability::metrics;

/// Result of a successful proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub index: u64,
    pub call: WalletCall,
}

/// Result of a confirm request.
///
/// Confirming twice is idempotent: the second request reports
/// `AlreadyConfirmed` and leaves the ledger untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Recorded { count: usize, call: WalletCall },
    AlreadyConfirmed { count: usize },
}

impl Confirmation {
    pub fn count(&self) -> usize {
        match self {
            Confirmation::Recorded { count, .. } | Confirmation::AlreadyConfirmed { count } => *count,
        }
    }
}

/// Result of a successful execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    pub transfer: TransferIntent,
    pub call: WalletCall,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionLedger {
    owners: OwnerSet,
    transactions: Vec<Transaction>,
}

impl TransactionLedger {
    pub fn new(owners: OwnerSet) -> Self {
        Self {
            owners,
            transactions: Vec::new(),
        }
    }

    /// Rebuild the ledger from chain snapshots ordered by index.
    pub fn from_snapshots(owners: OwnerSet, snapshots: Vec<TransactionSnapshot>) -> Self {
        let transactions = snapshots
            .into_iter()
            .enumerate()
            .map(|(i, snapshot)| snapshot.into_transaction(i as u64))
            .collect();
        Self {
            owners,
            transactions,
        }
    }

    pub fn owners(&self) -> &OwnerSet {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn transaction(&self, index: u64) -> Option<&Transaction> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.transactions.get(i))
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Derived predicate: quorum met and not yet executed.
    pub fn is_executable(&self, index: u64) -> bool {
        self.transaction(index)
            .map(|tx| !tx.is_executed() && self.owners.quorum_met(tx.confirmation_count()))
            .unwrap_or(false)
    }

    /// Register a new transfer and return its index.
    pub fn propose(
        &mut self,
        recipient: Address,
        amount: U256,
        payload: Bytes,
        proposer: Address,
    ) -> MultisigResult<Proposal> {
        self.owners.authorize(proposer)?;

        let index = self.transactions.len() as u64;
        self.transactions
            .push(Transaction::new(index, recipient, amount, payload.clone()));

        metrics::record_ledger_transition("propose");
        tracing::info!(
            index = index,
            proposer = %proposer,
            recipient = %recipient,
            amount = %amount,
            "Transaction proposed"
        );

        Ok(Proposal {
            index,
            call: WalletCall::Submit {
                recipient,
                amount,
                payload,
            },
        })
    }

    /// Record `confirmer`'s endorsement of transaction `index`.
    pub fn confirm(&mut self, index: u64, confirmer: Address) -> MultisigResult<Confirmation> {
        self.owners.authorize(confirmer)?;
        let tx = self.pending_mut(index)?;

        if !tx.add_confirmation(confirmer) {
            tracing::debug!(index = index, confirmer = %confirmer, "Confirmation already recorded");
            return Ok(Confirmation::AlreadyConfirmed {
                count: tx.confirmation_count(),
            });
        }

        let count = tx.confirmation_count();
        metrics::record_ledger_transition("confirm");
        tracing::info!(
            index = index,
            confirmer = %confirmer,
            confirmations = count,
            threshold = self.owners.threshold(),
            "Transaction confirmed"
        );

        Ok(Confirmation::Recorded {
            count,
            call: WalletCall::Confirm { index },
        })
    }

    /// Mark transaction `index` executed once quorum is reached.
    pub fn execute(&mut self, index: u64, executor: Address) -> MultisigResult<Execution> {
        self.owners.authorize(executor)?;
        let threshold = self.owners.threshold();
        let tx = self.pending_mut(index)?;

        let have = tx.confirmation_count();
        if have < threshold {
            return Err(MultisigError::QuorumNotMet {
                have,
                need: threshold,
            });
        }

        tx.mark_executed();
        let transfer = tx.transfer_intent();

        metrics::record_ledger_transition("execute");
        tracing::info!(
            index = index,
            executor = %executor,
            recipient = %transfer.recipient,
            amount = %transfer.amount,
            "Transaction executed"
        );

        Ok(Execution {
            transfer,
            call: WalletCall::Execute { index },
        })
    }

    /// Overwrite one entry with chain-observed state. Chain state wins;
    /// indices past the end extend the sequence.
    pub fn reconcile(&mut self, index: u64, snapshot: TransactionSnapshot) -> MultisigResult<()> {
        let position = usize::try_from(index).map_err(|_| MultisigError::UnknownTransaction(index))?;
        if position > self.transactions.len() {
            return Err(MultisigError::UnknownTransaction(index));
        }

        let tx = snapshot.into_transaction(index);
        if position == self.transactions.len() {
            self.transactions.push(tx);
        } else {
            self.transactions[position] = tx;
        }
        Ok(())
    }

    fn pending_mut(&mut self, index: u64) -> MultisigResult<&mut Transaction> {
        let tx = usize::try_from(index)
            .ok()
            .and_then(|i| self.transactions.get_mut(i))
            .ok_or(MultisigError::UnknownTransaction(index))?;

        if tx.is_executed() {
            return Err(MultisigError::AlreadyExecuted(index));
        }
        Ok(tx)
    }
}
