//! ABI bindings for the MultiSigWallet contract.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};

use crate::multisig::WalletCall;

sol! {
    /// Remote interface of the deployed custody wallet.
    #[derive(Debug, PartialEq, Eq)]
    interface IMultiSigWallet {
        event Deposit(address indexed sender, uint256 amount, uint256 balance);
        event SubmitTransaction(
            address indexed owner,
            uint256 indexed txIndex,
            address indexed to,
            uint256 value,
            bytes data
        );
        event ConfirmTransaction(address indexed owner, uint256 indexed txIndex);
        event ExecuteTransaction(address indexed owner, uint256 indexed txIndex);

        function submitTransaction(address to, uint256 value, bytes calldata data) external;
        function confirmTransaction(uint256 txIndex) external;
        function executeTransaction(uint256 txIndex) external;

        function getTransactionCount() external view returns (uint256);
        function getTransaction(uint256 txIndex)
            external
            view
            returns (address to, uint256 value, bytes memory data, bool executed, uint256 numConfirmations);
        function isConfirmed(uint256 txIndex, address owner) external view returns (bool);
        function numConfirmationsRequired() external view returns (uint256);
        function isOwner(address account) external view returns (bool);
    }
}

/// Calldata for a ledger transition.
pub fn encode_wallet_call(call: &WalletCall) -> Bytes {
    let encoded = match call {
        WalletCall::Submit {
            recipient,
            amount,
            payload,
        } => IMultiSigWallet::submitTransactionCall {
            to: *recipient,
            value: *amount,
            data: payload.clone(),
        }
        .abi_encode(),
        WalletCall::Confirm { index } => IMultiSigWallet::confirmTransactionCall {
            txIndex: U256::from(*index),
        }
        .abi_encode(),
        WalletCall::Execute { index } => IMultiSigWallet::executeTransactionCall {
            txIndex: U256::from(*index),
        }
        .abi_encode(),
    };
    encoded.into()
}

/// ABI-encoded `(address[] owners, uint256 numConfirmationsRequired)`.
pub fn encode_constructor_args(owners: &[Address], threshold: usize) -> Vec<u8> {
    (owners.to_vec(), U256::from(threshold)).abi_encode_params()
}
