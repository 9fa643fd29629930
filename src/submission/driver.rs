//! Submission driver.
//!
//! # Responsibilities
//! - Serialize submissions per signer while letting signers run concurrently
//! - Read the nonce fresh for every submission and refuse to reuse one whose
//!   outcome is unknown
//! - Price and budget gas according to the `SubmissionPolicy`
//! - Resolve ambiguous rejections through `classify_failure`
//! - Bound every wait for inclusion, and let shutdown cancel it
//!
//! Cancelling or timing out a wait does not withdraw the operation. It may
//! still be included afterwards; the signer stays blocked until a later
//! submission observes its receipt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, TxHash};
use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::timeout;

use crate::blockchain::client::LedgerClient;
use crate::blockchain::types::{BlockchainError, Operation, Receipt};
use crate::blockchain::wallet::OwnerKey;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics::{record_receipt_wait, record_submission};
use crate::resilience::retries::poll_until_some;
use crate::submission::classify::{classify_failure, FailureClass};
use crate::submission::intent::{Intent, IntentKind};
use crate::submission::policy::SubmissionPolicy;
use crate::submission::types::{
    SubmissionError, SubmissionRecord, SubmissionResult, SubmissionStatus,
};

/// Per-call overrides of the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub gas_limit: Option<u64>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct SignerSlot {
    last: Option<SubmissionRecord>,
}

pub struct SubmissionDriver<C: LedgerClient> {
    client: Arc<C>,
    policy: SubmissionPolicy,
    signers: DashMap<Address, Arc<Mutex<SignerSlot>>>,
    chain_id: OnceCell<u64>,
    derived_gas_limit: OnceCell<u64>,
    shutdown: Option<Shutdown>,
}

impl<C: LedgerClient> SubmissionDriver<C> {
    pub fn new(client: Arc<C>, policy: SubmissionPolicy) -> Self {
        Self {
            client,
            policy,
            signers: DashMap::new(),
            chain_id: OnceCell::new(),
            derived_gas_limit: OnceCell::new(),
            shutdown: None,
        }
    }

    /// Let `shutdown` cancel pending receipt waits.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn policy(&self) -> &SubmissionPolicy {
        &self.policy
    }

    /// Submit with the policy's defaults and wait for the receipt.
    pub async fn submit(&self, intent: &Intent, key: &OwnerKey) -> SubmissionResult<Receipt> {
        self.submit_with(intent, key, SubmitOptions::default()).await
    }

    /// Submit and wait for the receipt.
    ///
    /// A receipt is returned whether the operation succeeded or reverted;
    /// check `Receipt::success`.
    pub async fn submit_with(
        &self,
        intent: &Intent,
        key: &OwnerKey,
        options: SubmitOptions,
    ) -> SubmissionResult<Receipt> {
        let signer = key.address();
        let slot = self.slot(signer);
        let mut slot = slot.lock().await;

        if self.is_cancelled() {
            return Err(SubmissionError::Cancelled { hash: None });
        }

        self.resolve_previous(&mut slot).await?;
        // Unresolved means unknown, whatever nonce the node reports now.
        if let Some(previous) = slot.last.as_ref().filter(|r| r.is_unresolved()) {
            return Err(SubmissionError::NonceInFlight {
                signer,
                nonce: previous.nonce,
                hash: previous.hash,
            });
        }

        let nonce = self
            .client
            .current_nonce(signer, self.policy.nonce_source)
            .await?;
        if let Some(previous) = &slot.last {
            // A fatal rejection may have left its nonce unused.
            let reusable = previous.status == SubmissionStatus::RejectedFatal && nonce == previous.nonce;
            if nonce <= previous.nonce && !reusable {
                return Err(SubmissionError::StaleNonce {
                    signer,
                    nonce,
                    last: previous.nonce,
                });
            }
        }

        let operation = Operation {
            from: signer,
            to: intent.to,
            value: intent.value,
            input: intent.input.clone(),
            nonce,
            gas_limit: self.gas_limit_for(intent.kind, options.gas_limit).await?,
            gas_price: self.gas_price().await?,
            chain_id: self.chain_id().await?,
        };
        let signed = self.client.sign(&operation, key).await?;

        tracing::info!(
            intent = intent.label(),
            signer = %signer,
            nonce = nonce,
            tx_hash = %signed.hash,
            gas_limit = operation.gas_limit,
            "Submitting operation"
        );

        let mut record = SubmissionRecord {
            intent: intent.label(),
            signer,
            nonce,
            hash: signed.hash,
            status: SubmissionStatus::Pending,
        };

        match self.client.submit(&signed).await {
            Ok(hash) => {
                if hash != signed.hash {
                    tracing::warn!(
                        expected = %signed.hash,
                        reported = %hash,
                        "Node reported a different operation hash"
                    );
                }
                record.hash = hash;
            }
            Err(error) => {
                let failure = error.to_failure();
                match classify_failure(&failure) {
                    FailureClass::Recoverable(hash) => {
                        tracing::warn!(
                            signer = %signer,
                            nonce = nonce,
                            tx_hash = %hash,
                            reason = %failure.message,
                            "Rejection carries an operation hash, resolving through its receipt"
                        );
                        record.hash = hash;
                        record.status = SubmissionStatus::RejectedBenign;
                        slot.last = Some(record.clone());
                        return self.recover(&mut slot, record, options).await;
                    }
                    FailureClass::Duplicate => {
                        tracing::warn!(
                            signer = %signer,
                            tx_hash = %signed.hash,
                            "Node already holds this operation, waiting for it"
                        );
                    }
                    FailureClass::StaleNonce => {
                        record_submission(intent.label(), "stale_nonce");
                        return Err(SubmissionError::StaleNonce {
                            signer,
                            nonce,
                            last: slot.last.as_ref().map(|r| r.nonce).unwrap_or(nonce),
                        });
                    }
                    FailureClass::Fatal => {
                        tracing::error!(
                            signer = %signer,
                            nonce = nonce,
                            reason = %failure,
                            "Operation rejected"
                        );
                        record.status = SubmissionStatus::RejectedFatal;
                        slot.last = Some(record);
                        record_submission(intent.label(), "rejected_fatal");
                        return Err(SubmissionError::RejectedFatal {
                            signer,
                            nonce,
                            reason: failure,
                        });
                    }
                }
            }
        }

        slot.last = Some(record.clone());
        let receipt = self
            .await_receipt(record.intent, record.hash, options.timeout)
            .await?;
        self.settle(&mut slot, &receipt);
        Ok(receipt)
    }

    /// Last submission made for `signer`, if any.
    pub async fn last_submission(&self, signer: &Address) -> Option<SubmissionRecord> {
        let slot = self.signers.get(signer).map(|entry| entry.value().clone())?;
        let slot = slot.lock().await;
        slot.last.clone()
    }

    fn slot(&self, signer: Address) -> Arc<Mutex<SignerSlot>> {
        self.signers.entry(signer).or_default().value().clone()
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(Shutdown::is_triggered)
            .unwrap_or(false)
    }

    /// Look for the receipt of an operation whose wait was abandoned.
    async fn resolve_previous(&self, slot: &mut SignerSlot) -> SubmissionResult<()> {
        let Some(previous) = slot.last.as_mut().filter(|r| r.is_unresolved()) else {
            return Ok(());
        };
        if let Some(receipt) = self.client.get_receipt(previous.hash).await? {
            tracing::info!(
                signer = %previous.signer,
                nonce = previous.nonce,
                tx_hash = %previous.hash,
                success = receipt.success,
                "Earlier operation resolved"
            );
            previous.status = if receipt.success {
                SubmissionStatus::Confirmed
            } else {
                SubmissionStatus::RejectedBenign
            };
        }
        Ok(())
    }

    /// Resolve a rejection that named its operation hash.
    async fn recover(
        &self,
        slot: &mut SignerSlot,
        record: SubmissionRecord,
        options: SubmitOptions,
    ) -> SubmissionResult<Receipt> {
        let found = poll_until_some(
            self.policy.lookup_attempts,
            self.policy.lookup_base_delay_ms,
            self.policy.lookup_max_delay_ms,
            || self.client.get_receipt(record.hash),
        )
        .await?;

        let receipt = match found {
            Some(receipt) => {
                record_submission(record.intent, outcome_label(&receipt));
                receipt
            }
            None => {
                // Not indexed yet; the record stays unresolved while waiting.
                if let Some(last) = slot.last.as_mut() {
                    last.status = SubmissionStatus::Pending;
                }
                self.await_receipt(record.intent, record.hash, options.timeout)
                    .await?
            }
        };

        if let Some(last) = slot.last.as_mut() {
            last.status = SubmissionStatus::RejectedBenign;
        }
        tracing::info!(
            tx_hash = %receipt.transaction_hash,
            success = receipt.success,
            block = ?receipt.block_number,
            "Rejected operation resolved through its receipt"
        );
        Ok(receipt)
    }

    async fn await_receipt(
        &self,
        intent: &'static str,
        hash: TxHash,
        limit: Option<Duration>,
    ) -> SubmissionResult<Receipt> {
        let limit = limit.unwrap_or(self.policy.receipt_timeout);
        let started = Instant::now();
        let wait = timeout(limit, self.client.wait_for_receipt(hash));

        let outcome = match &self.shutdown {
            Some(shutdown) => tokio::select! {
                outcome = wait => outcome,
                _ = shutdown.wait() => {
                    tracing::warn!(tx_hash = %hash, "Receipt wait cancelled, operation may still be included");
                    record_submission(intent, "cancelled");
                    return Err(SubmissionError::Cancelled { hash: Some(hash) });
                }
            },
            None => wait.await,
        };

        match outcome {
            Ok(Ok(receipt)) => {
                record_receipt_wait(intent, started.elapsed().as_secs_f64());
                record_submission(intent, outcome_label(&receipt));
                tracing::info!(
                    tx_hash = %hash,
                    success = receipt.success,
                    block = ?receipt.block_number,
                    gas_used = receipt.gas_used,
                    "Operation included"
                );
                Ok(receipt)
            }
            Ok(Err(error)) => {
                record_submission(intent, "error");
                Err(error.into())
            }
            Err(_) => {
                tracing::warn!(tx_hash = %hash, waited = ?limit, "Receipt wait timed out");
                record_submission(intent, "timeout");
                Err(SubmissionError::Timeout {
                    hash,
                    waited: limit,
                })
            }
        }
    }

    fn settle(&self, slot: &mut SignerSlot, receipt: &Receipt) {
        if let Some(last) = slot.last.as_mut() {
            last.status = if receipt.success {
                SubmissionStatus::Confirmed
            } else {
                SubmissionStatus::RejectedBenign
            };
        }
    }

    async fn chain_id(&self) -> SubmissionResult<u64> {
        let expected = self.policy.chain_id;
        let id = self
            .chain_id
            .get_or_try_init(|| async {
                let actual = self.client.chain_id().await?;
                match expected {
                    Some(expected) if expected != actual => {
                        Err(BlockchainError::ChainMismatch { expected, actual })
                    }
                    _ => Ok(actual),
                }
            })
            .await?;
        Ok(*id)
    }

    async fn gas_limit_for(&self, kind: IntentKind, explicit: Option<u64>) -> SubmissionResult<u64> {
        if let Some(limit) = explicit {
            return Ok(limit);
        }
        if kind == IntentKind::Transfer {
            return Ok(self.policy.transfer_gas_limit);
        }
        if let Some(limit) = self.policy.gas_limit {
            return Ok(limit);
        }
        let limit = self
            .derived_gas_limit
            .get_or_try_init(|| async {
                let block_limit = self.client.block_gas_limit().await?;
                let limit = self.policy.derive_gas_limit(block_limit);
                tracing::debug!(block_gas_limit = block_limit, gas_limit = limit, "Derived gas budget");
                Ok::<_, BlockchainError>(limit)
            })
            .await?;
        Ok(*limit)
    }

    async fn gas_price(&self) -> SubmissionResult<u128> {
        let network_price = if self.policy.gas_price.needs_network() {
            self.client.gas_price().await?
        } else {
            0
        };
        Ok(self.policy.gas_price.resolve(network_price)?)
    }
}

fn outcome_label(receipt: &Receipt) -> &'static str {
    if receipt.success {
        "confirmed"
    } else {
        "reverted"
    }
}

impl<C: LedgerClient> std::fmt::Debug for SubmissionDriver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionDriver")
            .field("policy", &self.policy)
            .field("signers", &self.signers.len())
            .finish()
    }
}
