//! Local ledger mirror bound to a deployed wallet.
//!
//! Each transition is validated and staged on a copy of the mirror, sent to
//! the wallet, and committed only once its receipt shows success. A reverted
//! receipt, or a proposal index that differs from the local prediction,
//! rebuilds the mirror from chain state: the chain always wins.

use alloy::primitives::{Address, Bytes, U256};

use crate::blockchain::client::LedgerClient;
use crate::blockchain::types::Receipt;
use crate::blockchain::wallet::OwnerKey;
use crate::contract::handle::WalletContract;
use crate::error::{CustodyError, CustodyResult};
use crate::multisig::{Confirmation, Execution, OwnerSet, TransactionLedger};

pub struct WalletSession<C: LedgerClient> {
    contract: WalletContract<C>,
    ledger: TransactionLedger,
}

impl<C: LedgerClient> WalletSession<C> {
    /// Session over a freshly deployed wallet, which holds no transactions.
    pub fn new(contract: WalletContract<C>, owners: OwnerSet) -> Self {
        Self {
            contract,
            ledger: TransactionLedger::new(owners),
        }
    }

    /// Session over an existing wallet, mirrored from chain.
    pub async fn open(contract: WalletContract<C>, owners: OwnerSet) -> CustodyResult<Self> {
        let mut session = Self::new(contract, owners);
        session.sync().await?;
        Ok(session)
    }

    pub fn contract(&self) -> &WalletContract<C> {
        &self.contract
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn wallet(&self) -> Address {
        self.contract.address()
    }

    /// Replace the mirror with the wallet's on-chain state.
    pub async fn sync(&mut self) -> CustodyResult<()> {
        let owners = self.ledger.owners().clone();
        let snapshots = self.contract.snapshots(&owners).await?;
        tracing::debug!(
            wallet = %self.wallet(),
            transactions = snapshots.len(),
            "Ledger mirror synced from chain"
        );
        self.ledger = TransactionLedger::from_snapshots(owners, snapshots);
        Ok(())
    }

    /// Propose a transfer; returns the index observed in the wallet's event.
    pub async fn propose(
        &mut self,
        key: &OwnerKey,
        recipient: Address,
        amount: U256,
        payload: Bytes,
    ) -> CustodyResult<u64> {
        let mut staged = self.ledger.clone();
        let proposal = staged.propose(recipient, amount, payload, key.address())?;

        let receipt = self.contract.send(&proposal.call, key).await?;
        self.commit_or_resync("propose", staged, &receipt).await?;

        let observed = self
            .contract
            .proposed_index(&receipt)
            .ok_or(CustodyError::MissingEvent {
                event: "SubmitTransaction",
                hash: receipt.transaction_hash,
            })?;
        if observed != proposal.index {
            tracing::warn!(
                predicted = proposal.index,
                observed = observed,
                "Wallet assigned a different index, resyncing"
            );
            self.sync().await?;
        }

        tracing::info!(
            wallet = %self.wallet(),
            index = observed,
            tx_hash = %receipt.transaction_hash,
            "Proposal recorded"
        );
        Ok(observed)
    }

    /// Confirm transaction `index`. A repeat confirmation by the same owner
    /// is answered locally without touching the network.
    pub async fn confirm(&mut self, key: &OwnerKey, index: u64) -> CustodyResult<Confirmation> {
        let mut staged = self.ledger.clone();
        let confirmation = staged.confirm(index, key.address())?;

        let call = match &confirmation {
            Confirmation::AlreadyConfirmed { .. } => return Ok(confirmation),
            Confirmation::Recorded { call, .. } => call.clone(),
        };

        let receipt = self.contract.send(&call, key).await?;
        self.commit_or_resync("confirm", staged, &receipt).await?;
        Ok(confirmation)
    }

    /// Execute transaction `index` once quorum is reached.
    pub async fn execute(&mut self, key: &OwnerKey, index: u64) -> CustodyResult<Execution> {
        let mut staged = self.ledger.clone();
        let execution = staged.execute(index, key.address())?;

        let receipt = self.contract.send(&execution.call, key).await?;
        self.commit_or_resync("execute", staged, &receipt).await?;
        Ok(execution)
    }

    async fn commit_or_resync(
        &mut self,
        step: &'static str,
        staged: TransactionLedger,
        receipt: &Receipt,
    ) -> CustodyResult<()> {
        if receipt.success {
            self.ledger = staged;
            return Ok(());
        }

        tracing::warn!(
            step = step,
            tx_hash = %receipt.transaction_hash,
            "Wallet call reverted, resyncing mirror from chain"
        );
        self.sync().await?;
        Err(CustodyError::Reverted {
            step,
            hash: receipt.transaction_hash,
        })
    }
}
