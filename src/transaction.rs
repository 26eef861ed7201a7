//! Transaction records notarized by the ledger

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A report submitted by a principal. The ledger never inspects the payload
/// and never generates or deduplicates `transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub report: String,
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        report: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            report: report.into(),
            transaction_id: transaction_id.into(),
        }
    }

    /// Random 128-bit identifier rendered as lowercase hex, for callers that
    /// do not bring their own IDs.
    pub fn generate_id() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let tx = Transaction::new("alice", "x-ray", "t1");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["sender"], "alice");
        assert_eq!(json["report"], "x-ray");
        assert_eq!(json["transactionID"], "t1");
        assert!(json.get("transaction_id").is_none());
    }

    #[test]
    fn test_deserialize_from_legacy_shape() {
        let tx: Transaction =
            serde_json::from_str(r#"{"sender":"bob","report":"mri","transactionID":"abc"}"#).unwrap();
        assert_eq!(tx, Transaction::new("bob", "mri", "abc"));
    }

    #[test]
    fn test_generated_ids_are_hex_and_distinct() {
        let a = Transaction::generate_id();
        let b = Transaction::generate_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
