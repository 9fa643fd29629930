//! Classification of network rejections.
//!
//! Nodes report "included but reverted" in several shapes: a structured
//! `data` member carrying the transaction hash, a Ganache-style `data` object
//! keyed by the hash, or only the error text. Everything here is pure so the
//! driver's recovery path can be tested without a network.

use alloy::primitives::TxHash;
use serde_json::Value;

use crate::blockchain::types::LedgerFailure;

/// Members that carry the operation identifier in structured payloads.
const HASH_FIELDS: [&str; 4] = ["hash", "txHash", "transactionHash", "tx_hash"];

/// Nested `data` members followed before giving up on structure.
const MAX_DEPTH: usize = 3;

/// Length of `0x` plus 32 bytes of hex.
const HASH_TEXT_LEN: usize = 66;

const DUPLICATE_MARKERS: [&str; 3] = ["already known", "known transaction", "already imported"];
const STALE_NONCE_MARKERS: [&str; 2] = ["nonce too low", "nonce has already been used"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The operation has an identifier; its receipt decides the outcome.
    Recoverable(TxHash),
    /// The node already holds this exact signed operation.
    Duplicate,
    /// The nonce was consumed by another operation.
    StaleNonce,
    /// Nothing to recover.
    Fatal,
}

pub fn classify_failure(failure: &LedgerFailure) -> FailureClass {
    if let Some(hash) = failure.data.as_ref().and_then(|data| hash_from_value(data, 0)) {
        return FailureClass::Recoverable(hash);
    }
    if let Some(hash) = scan_text_for_hash(&failure.message) {
        return FailureClass::Recoverable(hash);
    }

    let message = failure.message.to_ascii_lowercase();
    if DUPLICATE_MARKERS.iter().any(|marker| message.contains(marker)) {
        return FailureClass::Duplicate;
    }
    if STALE_NONCE_MARKERS.iter().any(|marker| message.contains(marker)) {
        return FailureClass::StaleNonce;
    }
    FailureClass::Fatal
}

fn hash_from_value(value: &Value, depth: usize) -> Option<TxHash> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::String(text) => scan_text_for_hash(text),
        Value::Object(map) => {
            for field in HASH_FIELDS {
                if let Some(hash) = map.get(field).and_then(Value::as_str).and_then(parse_exact_hash) {
                    return Some(hash);
                }
            }
            // Ganache keys the revert details by the transaction hash.
            if let Some(hash) = map.keys().find_map(|key| parse_exact_hash(key)) {
                return Some(hash);
            }
            map.get("data").and_then(|nested| hash_from_value(nested, depth + 1))
        }
        _ => None,
    }
}

fn parse_exact_hash(text: &str) -> Option<TxHash> {
    let text = text.trim();
    if text.len() != HASH_TEXT_LEN || !text.starts_with("0x") {
        return None;
    }
    text.parse().ok()
}

/// First `0x` followed by exactly 64 hex digits.
fn scan_text_for_hash(text: &str) -> Option<TxHash> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = text[start..].find("0x") {
        let begin = start + offset;
        let digits = bytes[begin + 2..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if digits == HASH_TEXT_LEN - 2 {
            if let Some(hash) = parse_exact_hash(&text[begin..begin + HASH_TEXT_LEN]) {
                return Some(hash);
            }
        }
        start = begin + 2 + digits;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HASH: &str = "0x5b7a1b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f8";

    fn hash() -> TxHash {
        HASH.parse().unwrap()
    }

    #[test]
    fn test_structured_hash_field() {
        let failure = LedgerFailure::new(
            "execution reverted",
            Some(json!({ "hash": HASH, "reason": "tx not confirmed" })),
        );
        assert_eq!(classify_failure(&failure), FailureClass::Recoverable(hash()));
    }

    #[test]
    fn test_ganache_keyed_data() {
        let failure = LedgerFailure::new(
            "VM Exception while processing transaction: revert",
            Some(json!({
                HASH: { "error": "revert", "program_counter": 1234, "return": "0x" },
                "stack": "RuntimeError: VM Exception",
                "name": "RuntimeError"
            })),
        );
        assert_eq!(classify_failure(&failure), FailureClass::Recoverable(hash()));
    }

    #[test]
    fn test_nested_data_member() {
        let failure = LedgerFailure::new(
            "revert",
            Some(json!({ "data": { "data": { "transactionHash": HASH } } })),
        );
        assert_eq!(classify_failure(&failure), FailureClass::Recoverable(hash()));
    }

    #[test]
    fn test_textual_fallback() {
        let failure = LedgerFailure::from_message(format!(
            "server returned an error response: transaction {} reverted",
            HASH
        ));
        assert_eq!(classify_failure(&failure), FailureClass::Recoverable(hash()));
    }

    #[test]
    fn test_structured_preferred_over_text() {
        let other = "0x1111111111111111111111111111111111111111111111111111111111111111";
        let failure = LedgerFailure::new(
            format!("reverted {}", other),
            Some(json!({ "txHash": HASH })),
        );
        assert_eq!(classify_failure(&failure), FailureClass::Recoverable(hash()));
    }

    #[test]
    fn test_addresses_and_long_hex_are_not_hashes() {
        let failure = LedgerFailure::from_message(
            "sender 0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266 call data 0x5b7a1b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f800ff",
        );
        assert_eq!(classify_failure(&failure), FailureClass::Fatal);
    }

    #[test]
    fn test_malformed_structured_hash_falls_through() {
        let failure = LedgerFailure::new("revert", Some(json!({ "hash": "0x1234" })));
        assert_eq!(classify_failure(&failure), FailureClass::Fatal);
    }

    #[test]
    fn test_duplicate_submission() {
        let failure = LedgerFailure::from_message("server returned an error response: already known");
        assert_eq!(classify_failure(&failure), FailureClass::Duplicate);
    }

    #[test]
    fn test_stale_nonce() {
        let failure = LedgerFailure::from_message("Nonce too low. Expected nonce to be 4 but got 3.");
        assert_eq!(classify_failure(&failure), FailureClass::StaleNonce);
    }

    #[test]
    fn test_opaque_failure_is_fatal() {
        let failure = LedgerFailure::new("insufficient funds for gas * price + value", Some(json!(null)));
        assert_eq!(classify_failure(&failure), FailureClass::Fatal);
    }
}
