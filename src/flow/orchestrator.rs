//! End-to-end custody flow.
//!
//! # Ordering
//! ```text
//! deploy (or attach)
//!     → fund wallet (plain transfer, receipt awaited before anything else)
//!     → propose (index taken from the SubmitTransaction event)
//!     → confirm, once per configured owner
//!     → execute
//! ```
//!
//! Every step waits for its receipt before the next starts. Any error stops
//! the flow; `resume` picks an existing proposal back up by index.

use std::sync::Arc;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, Bytes, TxHash, U256};

use crate::blockchain::client::LedgerClient;
use crate::blockchain::wallet::OwnerKey;
use crate::config::schema::FlowConfig;
use crate::contract::artifact::ContractArtifact;
use crate::contract::handle::WalletContract;
use crate::error::{CustodyError, CustodyResult};
use crate::flow::session::WalletSession;
use crate::multisig::{parse_amount, Confirmation, MultisigError, OwnerSet};
use crate::submission::{Intent, SubmissionDriver};

/// Where the wallet comes from.
#[derive(Debug, Clone)]
pub enum WalletSource {
    Deploy(ContractArtifact),
    Attach(Address),
}

/// What the flow does, with owners named by position in the key list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPlan {
    pub funding: U256,
    pub funder: usize,
    pub recipient: Address,
    pub amount: U256,
    pub payload: Bytes,
    pub proposer: usize,
    pub confirmers: Vec<usize>,
    pub executor: usize,
}

impl FlowPlan {
    pub fn from_config(flow: &FlowConfig) -> CustodyResult<Self> {
        let payload = alloy::hex::decode(flow.payload.trim())
            .map_err(|e| MultisigError::Configuration(format!("invalid payload hex: {}", e)))?;
        Ok(Self {
            funding: parse_amount(&flow.funding_amount)?,
            funder: flow.funder,
            recipient: flow.recipient,
            amount: parse_amount(&flow.amount)?,
            payload: payload.into(),
            proposer: flow.proposer,
            confirmers: flow.confirmers.clone(),
            executor: flow.executor,
        })
    }
}

/// Outcome of a completed flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
    pub wallet: Address,
    pub index: u64,
    pub confirmations: usize,
    pub executed: bool,
    pub wallet_balance: U256,
    pub recipient_balance: U256,
    /// Operations submitted by this run, in order.
    pub operations: Vec<(&'static str, TxHash)>,
}

pub struct CustodyFlow<C: LedgerClient> {
    driver: Arc<SubmissionDriver<C>>,
    owners: OwnerSet,
    keys: Vec<OwnerKey>,
}

impl<C: LedgerClient> CustodyFlow<C> {
    /// The owner set is the keys' addresses, in key order.
    pub fn new(driver: Arc<SubmissionDriver<C>>, keys: Vec<OwnerKey>, threshold: usize) -> CustodyResult<Self> {
        let owners = OwnerSet::new(keys.iter().map(OwnerKey::address).collect(), threshold)?;
        tracing::info!(owners = %owners.description(), "Custody flow ready");
        Ok(Self {
            driver,
            owners,
            keys,
        })
    }

    pub fn owners(&self) -> &OwnerSet {
        &self.owners
    }

    pub fn driver(&self) -> &Arc<SubmissionDriver<C>> {
        &self.driver
    }

    /// Deploy or attach, and mirror the wallet locally.
    pub async fn open_wallet(&self, source: WalletSource) -> CustodyResult<(WalletSession<C>, Option<TxHash>)> {
        match source {
            WalletSource::Deploy(artifact) => {
                let deployer = self.key(0)?;
                let (contract, receipt) =
                    WalletContract::deploy(self.driver.clone(), &artifact, &self.owners, deployer).await?;
                Ok((
                    WalletSession::new(contract, self.owners.clone()),
                    Some(receipt.transaction_hash),
                ))
            }
            WalletSource::Attach(address) => {
                let contract = WalletContract::attach(self.driver.clone(), address, &self.owners).await?;
                Ok((WalletSession::open(contract, self.owners.clone()).await?, None))
            }
        }
    }

    /// Send `amount` from `funder` to the wallet and wait for it to land.
    pub async fn fund(&self, wallet: Address, funder: usize, amount: U256) -> CustodyResult<TxHash> {
        let key = self.key(funder)?;
        let receipt = self.driver.submit(&Intent::transfer(wallet, amount), key).await?;
        if !receipt.success {
            return Err(CustodyError::Reverted {
                step: "fund",
                hash: receipt.transaction_hash,
            });
        }
        tracing::info!(
            wallet = %wallet,
            from = %key.address(),
            amount = %format_ether(amount),
            tx_hash = %receipt.transaction_hash,
            "Wallet funded"
        );
        Ok(receipt.transaction_hash)
    }

    /// The complete flow: open, fund, propose, confirm, execute.
    pub async fn run(&self, source: WalletSource, plan: &FlowPlan) -> CustodyResult<FlowReport> {
        let (mut session, deploy_hash) = self.open_wallet(source).await?;
        let mut operations = Vec::new();
        if let Some(hash) = deploy_hash {
            operations.push(("deploy", hash));
        }

        if plan.funding > U256::ZERO {
            let hash = self.fund(session.wallet(), plan.funder, plan.funding).await?;
            operations.push(("fund", hash));
            self.report_balance("wallet after funding", session.wallet()).await?;
        }

        let proposer = self.key(plan.proposer)?;
        let index = session
            .propose(proposer, plan.recipient, plan.amount, plan.payload.clone())
            .await?;
        self.record_last(&mut operations, "propose", proposer).await;

        self.finish(session, index, plan, operations).await
    }

    /// Continue an existing proposal on an attached wallet.
    pub async fn resume(&self, wallet: Address, index: u64, plan: &FlowPlan) -> CustodyResult<FlowReport> {
        let (session, _) = self.open_wallet(WalletSource::Attach(wallet)).await?;
        if session.ledger().transaction(index).is_none() {
            return Err(MultisigError::UnknownTransaction(index).into());
        }
        tracing::info!(wallet = %wallet, index = index, "Resuming proposal");
        self.finish(session, index, plan, Vec::new()).await
    }

    async fn finish(
        &self,
        mut session: WalletSession<C>,
        index: u64,
        plan: &FlowPlan,
        mut operations: Vec<(&'static str, TxHash)>,
    ) -> CustodyResult<FlowReport> {
        let already_executed = session
            .ledger()
            .transaction(index)
            .map(|tx| tx.is_executed())
            .unwrap_or(false);

        if already_executed {
            tracing::info!(index = index, "Transaction already executed, nothing to do");
        } else {
            for &position in &plan.confirmers {
                let confirmer = self.key(position)?;
                let confirmation = session.confirm(confirmer, index).await?;
                match confirmation {
                    Confirmation::Recorded { count, .. } => {
                        self.record_last(&mut operations, "confirm", confirmer).await;
                        tracing::info!(index = index, confirmations = count, "Confirmation landed");
                    }
                    Confirmation::AlreadyConfirmed { count } => {
                        tracing::info!(
                            index = index,
                            owner = %confirmer.address(),
                            confirmations = count,
                            "Owner already confirmed, skipped"
                        );
                    }
                }
            }

            let executor = self.key(plan.executor)?;
            let execution = session.execute(executor, index).await?;
            self.record_last(&mut operations, "execute", executor).await;
            tracing::info!(
                index = index,
                recipient = %execution.transfer.recipient,
                amount = %format_ether(execution.transfer.amount),
                "Transfer executed"
            );
        }

        let wallet_balance = self.report_balance("wallet after execution", session.wallet()).await?;
        let tx = session
            .ledger()
            .transaction(index)
            .ok_or(MultisigError::UnknownTransaction(index))?;
        let recipient_balance = self.report_balance("recipient", tx.recipient).await?;

        Ok(FlowReport {
            wallet: session.wallet(),
            index,
            confirmations: tx.confirmation_count(),
            executed: tx.is_executed(),
            wallet_balance,
            recipient_balance,
            operations,
        })
    }

    async fn report_balance(&self, label: &str, account: Address) -> CustodyResult<U256> {
        let balance = self.driver.client().balance_of(account).await?;
        tracing::info!(account = %account, balance = %format_ether(balance), "Balance of {}", label);
        Ok(balance)
    }

    async fn record_last(&self, operations: &mut Vec<(&'static str, TxHash)>, step: &'static str, key: &OwnerKey) {
        if let Some(record) = self.driver.last_submission(&key.address()).await {
            operations.push((step, record.hash));
        }
    }

    fn key(&self, position: usize) -> CustodyResult<&OwnerKey> {
        self.keys.get(position).ok_or_else(|| {
            MultisigError::Configuration(format!(
                "owner {} does not exist, {} owner keys loaded",
                position,
                self.keys.len()
            ))
            .into()
        })
    }
}
