//! Handle to a deployed MultiSigWallet.
//!
//! State-changing calls go through the submission driver; views are plain
//! `eth_call`s against the latest block.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolEvent};

use crate::blockchain::client::LedgerClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, Receipt};
use crate::blockchain::wallet::OwnerKey;
use crate::contract::artifact::ContractArtifact;
use crate::contract::bindings::IMultiSigWallet;
use crate::error::{CustodyError, CustodyResult};
use crate::multisig::{OwnerSet, TransactionSnapshot, WalletCall};
use crate::submission::{Intent, SubmissionDriver, SubmissionResult};

/// On-chain summary of a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletStatus {
    pub address: Address,
    pub required_confirmations: usize,
    pub transaction_count: u64,
    pub balance: U256,
}

pub struct WalletContract<C: LedgerClient> {
    address: Address,
    driver: Arc<SubmissionDriver<C>>,
}

impl<C: LedgerClient> WalletContract<C> {
    /// Deploy a new wallet owned by `owners`.
    pub async fn deploy(
        driver: Arc<SubmissionDriver<C>>,
        artifact: &ContractArtifact,
        owners: &OwnerSet,
        deployer: &OwnerKey,
    ) -> CustodyResult<(Self, Receipt)> {
        let intent = Intent::deploy(&artifact.creation_code()?, owners.owners(), owners.threshold());
        let receipt = driver.submit(&intent, deployer).await?;
        if !receipt.success {
            return Err(CustodyError::Reverted {
                step: "deploy",
                hash: receipt.transaction_hash,
            });
        }
        let address = receipt.contract_address.ok_or(CustodyError::MissingEvent {
            event: "contract creation",
            hash: receipt.transaction_hash,
        })?;

        tracing::info!(
            wallet = %address,
            owners = owners.len(),
            threshold = owners.threshold(),
            tx_hash = %receipt.transaction_hash,
            "Wallet deployed"
        );
        Ok((Self { address, driver }, receipt))
    }

    /// Use an already deployed wallet, checking its threshold and that every
    /// configured owner is an owner on chain.
    pub async fn attach(
        driver: Arc<SubmissionDriver<C>>,
        address: Address,
        owners: &OwnerSet,
    ) -> CustodyResult<Self> {
        let contract = Self::at(driver, address);
        let on_chain = contract.required_confirmations().await?;
        if on_chain != owners.threshold() {
            return Err(CustodyError::ThresholdMismatch {
                on_chain,
                configured: owners.threshold(),
            });
        }
        for owner in owners.owners() {
            if !contract.is_owner(*owner).await? {
                return Err(CustodyError::OwnerMismatch {
                    wallet: address,
                    owner: *owner,
                });
            }
        }

        tracing::info!(wallet = %address, threshold = on_chain, "Attached to wallet");
        Ok(contract)
    }

    /// Handle without the threshold check, for read-only use.
    pub fn at(driver: Arc<SubmissionDriver<C>>, address: Address) -> Self {
        Self { address, driver }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn driver(&self) -> &Arc<SubmissionDriver<C>> {
        &self.driver
    }

    /// Submit a wallet call signed by `key`. A reverted call still returns
    /// its receipt.
    pub async fn send(&self, call: &WalletCall, key: &OwnerKey) -> SubmissionResult<Receipt> {
        let intent = Intent::wallet_call(self.address, call);
        self.driver.submit(&intent, key).await
    }

    /// Index assigned by a `submitTransaction`, read from its event.
    pub fn proposed_index(&self, receipt: &Receipt) -> Option<u64> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == self.address)
            .filter(|log| {
                log.data.topics().first() == Some(&IMultiSigWallet::SubmitTransaction::SIGNATURE_HASH)
            })
            .find_map(|log| IMultiSigWallet::SubmitTransaction::decode_log_data(&log.data).ok())
            .and_then(|event| u64::try_from(event.txIndex).ok())
    }

    pub async fn transaction_count(&self) -> BlockchainResult<u64> {
        let output = self.view(IMultiSigWallet::getTransactionCountCall {}).await?;
        to_u64(output, "transaction count")
    }

    pub async fn required_confirmations(&self) -> BlockchainResult<usize> {
        let output = self.view(IMultiSigWallet::numConfirmationsRequiredCall {}).await?;
        let required = to_u64(output, "confirmation threshold")?;
        usize::try_from(required)
            .map_err(|_| BlockchainError::Abi(format!("threshold {} out of range", required)))
    }

    pub async fn is_owner(&self, account: Address) -> BlockchainResult<bool> {
        self.view(IMultiSigWallet::isOwnerCall { account }).await
    }

    pub async fn is_confirmed(&self, index: u64, owner: Address) -> BlockchainResult<bool> {
        self.view(IMultiSigWallet::isConfirmedCall {
            txIndex: U256::from(index),
            owner,
        })
        .await
    }

    /// Chain state of one transaction; confirmations are read per owner.
    pub async fn transaction(&self, index: u64, owners: &OwnerSet) -> BlockchainResult<TransactionSnapshot> {
        let tx = self
            .view(IMultiSigWallet::getTransactionCall {
                txIndex: U256::from(index),
            })
            .await?;

        let mut confirmed_by = Vec::new();
        for owner in owners.owners() {
            if self.is_confirmed(index, *owner).await? {
                confirmed_by.push(*owner);
            }
        }
        if confirmed_by.len() as u64 != to_u64(tx.numConfirmations, "confirmation count")? {
            tracing::warn!(
                index = index,
                reported = %tx.numConfirmations,
                per_owner = confirmed_by.len(),
                "Confirmation count differs from per-owner checks"
            );
        }

        Ok(TransactionSnapshot {
            recipient: tx.to,
            amount: tx.value,
            payload: tx.data,
            executed: tx.executed,
            confirmed_by,
        })
    }

    /// Every transaction on chain, ordered by index.
    pub async fn snapshots(&self, owners: &OwnerSet) -> BlockchainResult<Vec<TransactionSnapshot>> {
        let count = self.transaction_count().await?;
        // The count comes from the contract; grow as transactions are read.
        let mut snapshots = Vec::new();
        for index in 0..count {
            snapshots.push(self.transaction(index, owners).await?);
        }
        Ok(snapshots)
    }

    pub async fn balance(&self) -> BlockchainResult<U256> {
        self.driver.client().balance_of(self.address).await
    }

    pub async fn status(&self) -> BlockchainResult<WalletStatus> {
        Ok(WalletStatus {
            address: self.address,
            required_confirmations: self.required_confirmations().await?,
            transaction_count: self.transaction_count().await?,
            balance: self.balance().await?,
        })
    }

    async fn view<T: SolCall>(&self, call: T) -> BlockchainResult<T::Return> {
        let input: Bytes = call.abi_encode().into();
        let output = self.driver.client().call(self.address, input).await?;
        T::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Abi(format!("{} returned malformed data: {}", T::SIGNATURE, e)))
    }
}

fn to_u64(value: U256, what: &str) -> BlockchainResult<u64> {
    u64::try_from(value).map_err(|_| BlockchainError::Abi(format!("{} {} out of range", what, value)))
}

impl<C: LedgerClient> std::fmt::Debug for WalletContract<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletContract")
            .field("address", &self.address)
            .finish()
    }
}
