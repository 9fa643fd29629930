//! Ledger client capability and its JSON-RPC implementation.
//!
//! # Responsibilities
//! - Define the `LedgerClient` seam the submission driver works against
//! - Connect to JSON-RPC endpoints with failover
//! - Query chain state (nonces, gas price, balances, receipts)
//! - Sign and broadcast raw transactions, normalizing rejections
//! - Handle timeouts and network errors gracefully

use alloy::eips::eip2718::Encodable2718;
use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, LedgerFailure, NetworkConfig, NonceSource,
    Operation, Receipt, SignedOperation,
};
use crate::blockchain::wallet::OwnerKey;
use crate::resilience::backoff::calculate_backoff;

/// Capability the custody core needs from a ledger network.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Next nonce for `account` as counted by `source`.
    async fn current_nonce(&self, account: Address, source: NonceSource) -> BlockchainResult<u64>;

    async fn gas_price(&self) -> BlockchainResult<u128>;

    async fn chain_id(&self) -> BlockchainResult<u64>;

    /// Gas limit of the latest block.
    async fn block_gas_limit(&self) -> BlockchainResult<u64>;

    async fn sign(&self, operation: &Operation, key: &OwnerKey) -> BlockchainResult<SignedOperation>;

    /// Broadcast a signed operation. A rejection is `BlockchainError::Rejected`.
    async fn submit(&self, signed: &SignedOperation) -> BlockchainResult<TxHash>;

    /// Wait until the operation is included. No deadline of its own.
    async fn wait_for_receipt(&self, hash: TxHash) -> BlockchainResult<Receipt>;

    /// Receipt if the operation has been included.
    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<Receipt>>;

    async fn balance_of(&self, account: Address) -> BlockchainResult<U256>;

    /// Read-only contract call against the latest state.
    async fn call(&self, to: Address, input: Bytes) -> BlockchainResult<Bytes>;
}

/// JSON-RPC ledger client with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: NetworkConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Fails only on an unparsable primary URL; an unreachable node is
    /// reported by the first request.
    pub async fn new(config: NetworkConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>);

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = ?config.chain_id,
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration, if one is set.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let Some(expected) = self.config.chain_id else {
            return Ok(());
        };
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != expected {
            return Err(BlockchainError::ChainMismatch {
                expected,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("get chain id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.with_failover("get receipt", |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Run `op` against each provider in turn until one answers in time.
    async fn with_failover<T, F, Fut>(&self, what: &str, op: F) -> BlockchainResult<T>
    where
        F: Fn(Arc<dyn Provider + Send + Sync>) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        Err(BlockchainError::Rpc(format!("All RPC providers failed to {}", what)))
    }

    /// Check if the blockchain is reachable and healthy.
    pub async fn is_healthy(&self) -> bool {
        self.get_block_number().await.is_ok()
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Get the number of confirmation blocks required.
    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

#[async_trait]
impl LedgerClient for BlockchainClient {
    async fn current_nonce(&self, account: Address, source: NonceSource) -> BlockchainResult<u64> {
        let block = match source {
            NonceSource::Latest => BlockId::latest(),
            NonceSource::Pending => BlockId::pending(),
        };
        self.with_failover("get transaction count", |p| async move {
            p.get_transaction_count(account).block_id(block).await
        })
        .await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("get gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.get_chain_id().await.map(u64::from)
    }

    async fn block_gas_limit(&self) -> BlockchainResult<u64> {
        let block = self
            .with_failover("get latest block", |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?;
        block
            .map(|block| block.header.gas_limit)
            .ok_or_else(|| BlockchainError::Rpc("Latest block unavailable".to_string()))
    }

    async fn sign(&self, operation: &Operation, key: &OwnerKey) -> BlockchainResult<SignedOperation> {
        let envelope = operation
            .to_request()
            .build(&key.ethereum_wallet())
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        Ok(SignedOperation {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718().into(),
            operation: operation.clone(),
        })
    }

    async fn submit(&self, signed: &SignedOperation) -> BlockchainResult<TxHash> {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.send_raw_transaction(&signed.raw);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                // The node answered: the rejection is authoritative.
                Ok(Err(e)) if e.as_error_resp().is_some() => {
                    return Err(BlockchainError::Rejected(failure_from_transport(&e)));
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "Broadcast failed, trying next provider");
                    last_error = Some(failure_from_transport(&e));
                }
                Err(_) => tracing::warn!(provider_idx = i, "Broadcast timeout"),
            }
        }
        Err(last_error
            .map(BlockchainError::Rejected)
            .unwrap_or_else(|| BlockchainError::Timeout(self.config.rpc_timeout_secs)))
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> BlockchainResult<Receipt> {
        let required_confirmations = self.config.confirmation_blocks;
        let poll_cap = self.config.poll_interval_ms.max(1);
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);
            sleep(calculate_backoff(attempt, poll_cap / 4 + 1, poll_cap)).await;

            let receipt = match self.get_transaction_receipt(hash).await? {
                Some(r) => r,
                None => {
                    tracing::debug!(tx_hash = %hash, "Transaction pending");
                    continue;
                }
            };

            let current_block = self.get_block_number().await?;
            let tx_block = receipt.block_number.unwrap_or(current_block);
            let confirmations = current_block.saturating_sub(tx_block) as u32;

            if confirmations >= required_confirmations {
                return Ok(receipt_from_rpc(receipt));
            }

            tracing::debug!(
                tx_hash = %hash,
                confirmations = confirmations,
                required = required_confirmations,
                "Waiting for confirmations"
            );
        }
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<Receipt>> {
        Ok(self.get_transaction_receipt(hash).await?.map(receipt_from_rpc))
    }

    async fn balance_of(&self, account: Address) -> BlockchainResult<U256> {
        self.with_failover("get balance", |p| async move { p.get_balance(account).await })
            .await
    }

    async fn call(&self, to: Address, input: Bytes) -> BlockchainResult<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(input);
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.call(request.clone());
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if e.as_error_resp().is_some() => {
                    return Err(BlockchainError::Rejected(failure_from_transport(&e)));
                }
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to execute call".to_string()))
    }
}

/// Normalize a transport error, keeping the JSON-RPC `data` member.
fn failure_from_transport(error: &TransportError) -> LedgerFailure {
    let data = error
        .as_error_resp()
        .and_then(|payload| payload.data.as_ref())
        .and_then(|raw| serde_json::from_str(raw.get()).ok());
    LedgerFailure::new(error.to_string(), data)
}

fn receipt_from_rpc(receipt: TransactionReceipt) -> Receipt {
    Receipt {
        transaction_hash: receipt.transaction_hash,
        success: receipt.status(),
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        contract_address: receipt.contract_address,
        logs: receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect(),
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> NetworkConfig {
        NetworkConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: Vec::new(),
            chain_id: Some(1337), // Ganache default
            rpc_timeout_secs: 1,
            confirmation_blocks: 0,
            poll_interval_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_client_creation() {
        // Client creation should succeed even if RPC is unreachable
        let result = BlockchainClient::new(test_config()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = BlockchainClient::new(config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_rpc_failover() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        config.failover_urls.push("::invalid::".to_string());

        let client = BlockchainClient::new(config).await.unwrap();
        assert_eq!(client.providers.len(), 2);

        let result = client.get_chain_id().await;
        assert!(result.unwrap_err().to_string().contains("All RPC providers failed"));
    }

    #[tokio::test]
    async fn test_chain_check_skipped_without_configured_id() {
        let mut config = test_config();
        config.chain_id = None;
        let client = BlockchainClient::new(config).await.unwrap();
        assert!(client.verify_chain_id().await.is_ok());
    }
}
