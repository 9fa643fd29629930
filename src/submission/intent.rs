//! Operations the driver knows how to submit.

use alloy::primitives::{Address, Bytes, U256};

use crate::contract::bindings::{encode_constructor_args, encode_wallet_call};
use crate::multisig::WalletCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    Deploy,
    Transfer,
    Propose,
    Confirm,
    Execute,
}

impl IntentKind {
    pub fn label(self) -> &'static str {
        match self {
            IntentKind::Deploy => "deploy",
            IntentKind::Transfer => "transfer",
            IntentKind::Propose => "propose",
            IntentKind::Confirm => "confirm",
            IntentKind::Execute => "execute",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A desired state change on the ledger, before nonce and gas are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub kind: IntentKind,
    /// `None` deploys `input` as a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl Intent {
    /// Deploy the wallet contract with its owner registry.
    pub fn deploy(creation_code: &Bytes, owners: &[Address], threshold: usize) -> Self {
        let mut input = creation_code.to_vec();
        input.extend_from_slice(&encode_constructor_args(owners, threshold));
        Self {
            kind: IntentKind::Deploy,
            to: None,
            value: U256::ZERO,
            input: input.into(),
        }
    }

    /// Plain value transfer, not a contract call.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            kind: IntentKind::Transfer,
            to: Some(to),
            value,
            input: Bytes::new(),
        }
    }

    /// Call into the deployed wallet contract.
    pub fn wallet_call(wallet: Address, call: &WalletCall) -> Self {
        let kind = match call {
            WalletCall::Submit { .. } => IntentKind::Propose,
            WalletCall::Confirm { .. } => IntentKind::Confirm,
            WalletCall::Execute { .. } => IntentKind::Execute,
        };
        Self {
            kind,
            to: Some(wallet),
            value: U256::ZERO,
            input: encode_wallet_call(call),
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}
