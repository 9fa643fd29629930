//! Shared utilities for integration tests.
//!
//! `MockLedger` is an in-memory ledger implementing `LedgerClient`: nonces,
//! balances and a MultiSigWallet with the contract's revert rules, plus knobs
//! for holding receipts and shaping rejections.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, Log, TxHash, U256};
use alloy::sol_types::{SolEvent, SolInterface, SolValue};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use multisig_custody::blockchain::{
    BlockchainError, BlockchainResult, LedgerClient, LedgerFailure, NonceSource, Operation, OwnerKey,
    Receipt, SignedOperation,
};
use multisig_custody::contract::{ContractArtifact, IMultiSigWallet};
use multisig_custody::submission::{GasPriceSource, SubmissionDriver, SubmissionPolicy};

pub const CHAIN_ID: u64 = 1337;
pub const GAS_PRICE: u128 = 20_000_000_000;
pub const BLOCK_GAS_LIMIT: u64 = 6_721_975;

/// Creation code the mock recognizes as the wallet contract.
pub const WALLET_CODE: [u8; 4] = [0x60, 0x80, 0x60, 0x40];

/// Anvil's first three development keys.
pub const OWNER_KEYS: [&str; 3] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
];

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

pub fn owner_keys(count: usize) -> Vec<OwnerKey> {
    OWNER_KEYS[..count]
        .iter()
        .map(|key| OwnerKey::from_private_key(key).unwrap())
        .collect()
}

pub fn wallet_artifact() -> ContractArtifact {
    ContractArtifact {
        abi: json!([]),
        bytecode: alloy::hex::encode_prefixed(WALLET_CODE),
    }
}

/// Policy with short waits so failures surface quickly.
pub fn fast_policy() -> SubmissionPolicy {
    SubmissionPolicy {
        chain_id: Some(CHAIN_ID),
        receipt_timeout: Duration::from_secs(2),
        lookup_attempts: 3,
        lookup_base_delay_ms: 1,
        lookup_max_delay_ms: 5,
        gas_price: GasPriceSource::Network {
            multiplier: 1.0,
            max_gwei: 100,
        },
        ..SubmissionPolicy::default()
    }
}

pub fn driver(ledger: &Arc<MockLedger>) -> Arc<SubmissionDriver<MockLedger>> {
    Arc::new(SubmissionDriver::new(ledger.clone(), fast_policy()))
}

/// How a reverted operation is reported at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertStyle {
    /// Accepted; only the receipt shows the revert.
    Silent,
    /// `data: { "hash": ... }`
    Structured,
    /// `data: { "<hash>": { "error": "revert" } }`, as Ganache reports it.
    Keyed,
    /// Hash only inside the message text.
    Textual,
    /// No identifier anywhere.
    Opaque,
}

#[derive(Debug, Clone, Default)]
struct WalletTx {
    to: Address,
    value: U256,
    data: Bytes,
    executed: bool,
    confirmed: Vec<Address>,
}

#[derive(Debug, Clone)]
struct Wallet {
    owners: Vec<Address>,
    required: usize,
    txs: Vec<WalletTx>,
    /// Count answered by `getTransactionCount` instead of the real one.
    reported_count: Option<u64>,
}

#[derive(Debug, Clone, Default)]
struct Accounts {
    balances: HashMap<Address, U256>,
    wallets: HashMap<Address, Wallet>,
}

struct State {
    accounts: Accounts,
    /// Next nonce the mempool accepts.
    pending_nonces: HashMap<Address, u64>,
    /// Count of operations whose receipt is visible.
    mined_nonces: HashMap<Address, u64>,
    receipts: HashMap<TxHash, Receipt>,
    held: Vec<(Address, Receipt)>,
    hold: bool,
    block: u64,
    gas_price: u128,
    revert_style: RevertStyle,
    fail_next: Option<LedgerFailure>,
    duplicate_next: bool,
    submitted: Vec<Operation>,
}

pub struct MockLedger {
    state: Mutex<State>,
    released: Notify,
}

enum Outcome {
    Success { logs: Vec<Log>, created: Option<Address> },
    Revert,
}

impl MockLedger {
    /// Ledger where each of `funded` holds 100 ether.
    pub fn new(funded: &[Address]) -> Arc<Self> {
        let balances = funded.iter().map(|a| (*a, ether(100))).collect();
        Arc::new(Self {
            state: Mutex::new(State {
                accounts: Accounts {
                    balances,
                    wallets: HashMap::new(),
                },
                pending_nonces: HashMap::new(),
                mined_nonces: HashMap::new(),
                receipts: HashMap::new(),
                held: Vec::new(),
                hold: false,
                block: 0,
                gas_price: GAS_PRICE,
                revert_style: RevertStyle::Silent,
                fail_next: None,
                duplicate_next: false,
                submitted: Vec::new(),
            }),
            released: Notify::new(),
        })
    }

    pub fn with_owners(keys: &[OwnerKey]) -> Arc<Self> {
        let addresses: Vec<Address> = keys.iter().map(OwnerKey::address).collect();
        Self::new(&addresses)
    }

    /// Keep new receipts invisible until `release_receipts`.
    pub fn hold_receipts(&self) {
        self.state.lock().unwrap().hold = true;
    }

    pub fn release_receipts(&self) {
        let mut state = self.state.lock().unwrap();
        state.hold = false;
        let held = std::mem::take(&mut state.held);
        for (from, receipt) in held {
            *state.mined_nonces.entry(from).or_default() += 1;
            state.receipts.insert(receipt.transaction_hash, receipt);
        }
        drop(state);
        self.released.notify_waiters();
    }

    pub fn set_revert_style(&self, style: RevertStyle) {
        self.state.lock().unwrap().revert_style = style;
    }

    pub fn set_gas_price(&self, price: u128) {
        self.state.lock().unwrap().gas_price = price;
    }

    /// Reject the next broadcast without including it.
    pub fn fail_next_submit(&self, failure: LedgerFailure) {
        self.state.lock().unwrap().fail_next = Some(failure);
    }

    /// Include the next broadcast but answer "already known".
    pub fn duplicate_next_submit(&self) {
        self.state.lock().unwrap().duplicate_next = true;
    }

    /// Operations broadcast so far, including rejected ones.
    pub fn submitted(&self) -> Vec<Operation> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .accounts
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    /// `(executed, confirmers)` of a wallet transaction.
    pub fn wallet_tx(&self, wallet: Address, index: usize) -> Option<(bool, Vec<Address>)> {
        let state = self.state.lock().unwrap();
        let tx = state.accounts.wallets.get(&wallet)?.txs.get(index)?;
        Some((tx.executed, tx.confirmed.clone()))
    }

    pub fn wallet_tx_count(&self, wallet: Address) -> usize {
        let state = self.state.lock().unwrap();
        state.accounts.wallets.get(&wallet).map(|w| w.txs.len()).unwrap_or(0)
    }

    /// Confirm directly on the contract, bypassing the client.
    pub fn confirm_out_of_band(&self, wallet: Address, index: usize, owner: Address) {
        let mut state = self.state.lock().unwrap();
        let tx = &mut state.accounts.wallets.get_mut(&wallet).unwrap().txs[index];
        if !tx.confirmed.contains(&owner) {
            tx.confirmed.push(owner);
        }
    }

    /// Make `getTransactionCount` answer `count` regardless of the stored transactions.
    pub fn misreport_transaction_count(&self, wallet: Address, count: u64) {
        let mut state = self.state.lock().unwrap();
        state.accounts.wallets.get_mut(&wallet).unwrap().reported_count = Some(count);
    }

    fn receipt(&self, hash: &TxHash) -> Option<Receipt> {
        self.state.lock().unwrap().receipts.get(hash).cloned()
    }
}

fn revert_failure(style: RevertStyle, hash: TxHash) -> Option<LedgerFailure> {
    let message = "VM Exception while processing transaction: revert";
    match style {
        RevertStyle::Silent => None,
        RevertStyle::Structured => Some(LedgerFailure::new(
            "execution reverted",
            Some(json!({ "hash": hash.to_string(), "reason": "revert" })),
        )),
        RevertStyle::Keyed => {
            let mut data = Map::new();
            data.insert(hash.to_string(), json!({ "error": "revert", "return": "0x" }));
            data.insert("name".to_string(), Value::String("RuntimeError".to_string()));
            Some(LedgerFailure::new(message, Some(Value::Object(data))))
        }
        RevertStyle::Textual => Some(LedgerFailure::from_message(format!("{} (tx {})", message, hash))),
        RevertStyle::Opaque => Some(LedgerFailure::from_message(message)),
    }
}

fn rejected(message: &str) -> BlockchainError {
    BlockchainError::Rejected(LedgerFailure::from_message(message))
}

fn transfer(accounts: &mut Accounts, from: Address, to: Address, value: U256) -> bool {
    if value.is_zero() {
        return true;
    }
    let balance = accounts.balances.get(&from).copied().unwrap_or_default();
    if balance < value {
        return false;
    }
    accounts.balances.insert(from, balance - value);
    *accounts.balances.entry(to).or_default() += value;
    true
}

/// Apply an operation to a scratch copy; the caller commits on success.
fn apply(accounts: &mut Accounts, op: &Operation) -> Outcome {
    let Some(to) = op.to else {
        return deploy(accounts, op);
    };

    if !transfer(accounts, op.from, to, op.value) {
        return Outcome::Revert;
    }
    let Some(wallet) = accounts.wallets.get(&to).cloned() else {
        return Outcome::Success { logs: Vec::new(), created: None };
    };

    if op.input.is_empty() {
        let balance = accounts.balances.get(&to).copied().unwrap_or_default();
        let event = IMultiSigWallet::Deposit {
            sender: op.from,
            amount: op.value,
            balance,
        };
        return Outcome::Success {
            logs: vec![Log { address: to, data: event.encode_log_data() }],
            created: None,
        };
    }

    let Ok(call) = IMultiSigWallet::IMultiSigWalletCalls::abi_decode(&op.input) else {
        return Outcome::Revert;
    };
    let mut wallet = wallet;
    if !wallet.owners.contains(&op.from) {
        return Outcome::Revert;
    }

    let log = match call {
        IMultiSigWallet::IMultiSigWalletCalls::submitTransaction(c) => {
            let index = wallet.txs.len();
            wallet.txs.push(WalletTx {
                to: c.to,
                value: c.value,
                data: c.data.clone(),
                ..WalletTx::default()
            });
            IMultiSigWallet::SubmitTransaction {
                owner: op.from,
                txIndex: U256::from(index),
                to: c.to,
                value: c.value,
                data: c.data,
            }
            .encode_log_data()
        }
        IMultiSigWallet::IMultiSigWalletCalls::confirmTransaction(c) => {
            let index = c.txIndex.to::<usize>();
            let Some(tx) = wallet.txs.get_mut(index) else {
                return Outcome::Revert;
            };
            if tx.executed || tx.confirmed.contains(&op.from) {
                return Outcome::Revert;
            }
            tx.confirmed.push(op.from);
            IMultiSigWallet::ConfirmTransaction {
                owner: op.from,
                txIndex: c.txIndex,
            }
            .encode_log_data()
        }
        IMultiSigWallet::IMultiSigWalletCalls::executeTransaction(c) => {
            let index = c.txIndex.to::<usize>();
            let required = wallet.required;
            let Some(tx) = wallet.txs.get_mut(index) else {
                return Outcome::Revert;
            };
            if tx.executed || tx.confirmed.len() < required {
                return Outcome::Revert;
            }
            tx.executed = true;
            let (recipient, value) = (tx.to, tx.value);
            if !transfer(accounts, to, recipient, value) {
                return Outcome::Revert;
            }
            IMultiSigWallet::ExecuteTransaction {
                owner: op.from,
                txIndex: c.txIndex,
            }
            .encode_log_data()
        }
        _ => return Outcome::Revert,
    };

    accounts.wallets.insert(to, wallet);
    Outcome::Success {
        logs: vec![Log { address: to, data: log }],
        created: None,
    }
}

fn deploy(accounts: &mut Accounts, op: &Operation) -> Outcome {
    if !op.input.starts_with(&WALLET_CODE) {
        return Outcome::Revert;
    }
    let Ok((owners, required)) = <(Vec<Address>, U256)>::abi_decode_params(&op.input[WALLET_CODE.len()..]) else {
        return Outcome::Revert;
    };
    let required = required.to::<usize>();
    let mut unique = owners.clone();
    unique.sort();
    unique.dedup();
    if owners.is_empty()
        || unique.len() != owners.len()
        || owners.iter().any(|o| o.is_zero())
        || required == 0
        || required > owners.len()
    {
        return Outcome::Revert;
    }

    let address = op.from.create(op.nonce);
    accounts.wallets.insert(
        address,
        Wallet {
            owners,
            required,
            txs: Vec::new(),
            reported_count: None,
        },
    );
    Outcome::Success {
        logs: Vec::new(),
        created: Some(address),
    }
}

fn view(accounts: &Accounts, to: Address, input: &Bytes) -> BlockchainResult<Bytes> {
    let wallet = accounts
        .wallets
        .get(&to)
        .ok_or_else(|| rejected("execution reverted"))?;
    let call = IMultiSigWallet::IMultiSigWalletCalls::abi_decode(input)
        .map_err(|_| rejected("execution reverted"))?;

    let encoded = match call {
        IMultiSigWallet::IMultiSigWalletCalls::getTransactionCount(_) => {
            U256::from(wallet.reported_count.unwrap_or(wallet.txs.len() as u64)).abi_encode()
        }
        IMultiSigWallet::IMultiSigWalletCalls::numConfirmationsRequired(_) => U256::from(wallet.required).abi_encode(),
        IMultiSigWallet::IMultiSigWalletCalls::getTransaction(c) => {
            let tx = wallet
                .txs
                .get(c.txIndex.to::<usize>())
                .ok_or_else(|| rejected("execution reverted: tx does not exist"))?;
            (tx.to, tx.value, tx.data.clone(), tx.executed, U256::from(tx.confirmed.len())).abi_encode_params()
        }
        IMultiSigWallet::IMultiSigWalletCalls::isConfirmed(c) => {
            let confirmed = wallet
                .txs
                .get(c.txIndex.to::<usize>())
                .map(|tx| tx.confirmed.contains(&c.owner))
                .unwrap_or(false);
            confirmed.abi_encode()
        }
        IMultiSigWallet::IMultiSigWalletCalls::isOwner(c) => wallet.owners.contains(&c.account).abi_encode(),
        _ => return Err(rejected("execution reverted")),
    };
    Ok(encoded.into())
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn current_nonce(&self, account: Address, source: NonceSource) -> BlockchainResult<u64> {
        let state = self.state.lock().unwrap();
        let nonces = match source {
            NonceSource::Latest => &state.mined_nonces,
            NonceSource::Pending => &state.pending_nonces,
        };
        Ok(nonces.get(&account).copied().unwrap_or(0))
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        Ok(self.state.lock().unwrap().gas_price)
    }

    async fn chain_id(&self) -> BlockchainResult<u64> {
        Ok(CHAIN_ID)
    }

    async fn block_gas_limit(&self) -> BlockchainResult<u64> {
        Ok(BLOCK_GAS_LIMIT)
    }

    async fn sign(&self, operation: &Operation, key: &OwnerKey) -> BlockchainResult<SignedOperation> {
        assert_eq!(operation.from, key.address());
        let mut preimage = Vec::new();
        preimage.extend_from_slice(operation.from.as_slice());
        preimage.extend_from_slice(&operation.nonce.to_be_bytes());
        preimage.extend_from_slice(&operation.chain_id.to_be_bytes());
        preimage.extend_from_slice(operation.to.unwrap_or_default().as_slice());
        preimage.extend_from_slice(&operation.value.to_be_bytes::<32>());
        preimage.extend_from_slice(&operation.input);
        Ok(SignedOperation {
            hash: keccak256(&preimage),
            raw: preimage.into(),
            operation: operation.clone(),
        })
    }

    async fn submit(&self, signed: &SignedOperation) -> BlockchainResult<TxHash> {
        let mut state = self.state.lock().unwrap();
        let op = signed.operation.clone();
        state.submitted.push(op.clone());

        if let Some(failure) = state.fail_next.take() {
            return Err(BlockchainError::Rejected(failure));
        }
        if op.chain_id != CHAIN_ID {
            return Err(rejected("invalid chain id"));
        }
        if op.gas_limit > BLOCK_GAS_LIMIT {
            return Err(rejected("exceeds block gas limit"));
        }
        let expected = state.pending_nonces.get(&op.from).copied().unwrap_or(0);
        if op.nonce < expected {
            return Err(rejected("nonce too low"));
        }
        if op.nonce > expected {
            return Err(rejected("nonce too high"));
        }
        state.pending_nonces.insert(op.from, expected + 1);

        let mut scratch = state.accounts.clone();
        let (success, logs, created) = match apply(&mut scratch, &op) {
            Outcome::Success { logs, created } => {
                state.accounts = scratch;
                (true, logs, created)
            }
            Outcome::Revert => (false, Vec::new(), None),
        };

        state.block += 1;
        let receipt = Receipt {
            transaction_hash: signed.hash,
            success,
            block_number: Some(state.block),
            gas_used: 21_000,
            contract_address: created,
            logs,
        };
        if state.hold {
            state.held.push((op.from, receipt));
        } else {
            *state.mined_nonces.entry(op.from).or_default() += 1;
            state.receipts.insert(signed.hash, receipt);
        }

        if std::mem::take(&mut state.duplicate_next) {
            return Err(rejected("already known"));
        }
        if !success {
            if let Some(failure) = revert_failure(state.revert_style, signed.hash) {
                return Err(BlockchainError::Rejected(failure));
            }
        }
        Ok(signed.hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> BlockchainResult<Receipt> {
        loop {
            let released = self.released.notified();
            if let Some(receipt) = self.receipt(&hash) {
                return Ok(receipt);
            }
            released.await;
        }
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<Receipt>> {
        Ok(self.receipt(&hash))
    }

    async fn balance_of(&self, account: Address) -> BlockchainResult<U256> {
        Ok(self.balance(account))
    }

    async fn call(&self, to: Address, input: Bytes) -> BlockchainResult<Bytes> {
        let state = self.state.lock().unwrap();
        view(&state.accounts, to, &input)
    }
}
