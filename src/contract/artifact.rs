//! Compiled contract artifact: `{ "abi": [...], "bytecode": "0x..." }`.
//!
//! Produced by the external compilation step. Truffle build files carry the
//! same two fields among many others; the extras are ignored.

use alloy::primitives::Bytes;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{CustodyError, CustodyResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractArtifact {
    /// Interface description, kept opaque.
    pub abi: serde_json::Value,
    /// Creation bytecode as hex, with or without `0x`.
    pub bytecode: String,
}

impl ContractArtifact {
    pub fn load(path: &Path) -> CustodyResult<Self> {
        let file = File::open(path).map_err(|e| {
            CustodyError::Artifact(format!("cannot open {}: {}", path.display(), e))
        })?;
        let artifact: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            CustodyError::Artifact(format!("invalid artifact {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "Contract artifact loaded");
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> CustodyResult<()> {
        let file = File::create(path).map_err(|e| {
            CustodyError::Artifact(format!("cannot create {}: {}", path.display(), e))
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| CustodyError::Artifact(format!("cannot write artifact: {}", e)))
    }

    /// Decoded creation bytecode.
    pub fn creation_code(&self) -> CustodyResult<Bytes> {
        let code = alloy::hex::decode(self.bytecode.trim())
            .map_err(|e| CustodyError::Artifact(format!("invalid bytecode hex: {}", e)))?;
        if code.is_empty() {
            return Err(CustodyError::Artifact("bytecode is empty".to_string()));
        }
        Ok(code.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_truffle_build_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet_contract.json");
        std::fs::write(
            &path,
            r#"{
                "contractName": "wallet_contract",
                "abi": [{"type": "constructor", "inputs": []}],
                "bytecode": "0x6080604052",
                "networks": {}
            }"#,
        )
        .unwrap();

        let artifact = ContractArtifact::load(&path).unwrap();
        assert!(artifact.abi.is_array());
        assert_eq!(
            artifact.creation_code().unwrap(),
            Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52])
        );
    }

    #[test]
    fn test_bytecode_without_prefix() {
        let artifact = ContractArtifact {
            abi: serde_json::json!([]),
            bytecode: "6080".to_string(),
        };
        assert_eq!(artifact.creation_code().unwrap().len(), 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MultiSigWallet.json");
        let artifact = ContractArtifact {
            abi: serde_json::json!([{"type": "function", "name": "getTransactionCount"}]),
            bytecode: "0x60806040".to_string(),
        };
        artifact.save(&path).unwrap();

        let loaded = ContractArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
    }

    #[test]
    fn test_rejects_bad_bytecode() {
        let artifact = ContractArtifact {
            abi: serde_json::json!([]),
            bytecode: "0xzz".to_string(),
        };
        assert!(artifact.creation_code().is_err());

        let empty = ContractArtifact {
            abi: serde_json::json!([]),
            bytecode: "0x".to_string(),
        };
        assert!(empty.creation_code().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ContractArtifact::load(Path::new("/nonexistent/artifact.json")).unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }
}
