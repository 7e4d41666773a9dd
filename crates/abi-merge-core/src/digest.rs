//! Canonical digests.
//!
//! Canonical bytes are RFC 8785 JSON Canonicalization Scheme (JCS):
//! object keys sorted, array order preserved. Digests are SHA-256,
//! lowercase hex.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entry::{EntryError, InterfaceEntry};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Serialize a value to JCS bytes.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json_canonicalizer::to_vec(&value)
}

/// SHA-256 of bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Whether `s` looks like a hex-encoded SHA-256 digest.
pub fn is_digest_hex(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Deduplication key of one entry: SHA-256 of its JCS form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryFingerprint(String);

impl EntryFingerprint {
    /// Fingerprint an entry as it stands, without validating it.
    pub fn of(entry: &InterfaceEntry) -> Result<Self, EntryError> {
        let bytes =
            canonical_bytes(entry).map_err(|e| EntryError::Canonicalization(e.to_string()))?;
        Ok(Self(sha256_hex(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drift-detection digest over a full ordered list of inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateChecksum(String);

impl AggregateChecksum {
    /// Hash already-canonical bytes.
    pub fn from_canonical(bytes: &[u8]) -> Self {
        Self(sha256_hex(bytes))
    }

    /// Parse a hex digest, normalizing to lowercase.
    pub fn from_hex(s: &str) -> Option<Self> {
        is_digest_hex(s).then(|| Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AggregateChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Mutability;
    use serde_json::json;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_canonical_bytes_sort_keys() {
        let bytes = canonical_bytes(&json!({"b": 1, "a": [2, 1]})).unwrap();
        assert_eq!(bytes, br#"{"a":[2,1],"b":1}"#);
    }

    #[test]
    fn test_fingerprint_ignores_field_insertion_order() {
        let a = InterfaceEntry::function("f", Mutability::View)
            .with_field("inputs", json!([]))
            .with_field("outputs", json!([]));
        let b = InterfaceEntry::function("f", Mutability::View)
            .with_field("outputs", json!([]))
            .with_field("inputs", json!([]));
        assert_eq!(EntryFingerprint::of(&a).unwrap(), EntryFingerprint::of(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_sensitive_to_mutability() {
        let a = InterfaceEntry::function("f", Mutability::View);
        let b = InterfaceEntry::function("f", Mutability::Nonpayable);
        assert_ne!(EntryFingerprint::of(&a).unwrap(), EntryFingerprint::of(&b).unwrap());
    }

    #[test]
    fn test_checksum_from_hex() {
        let upper = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        let parsed = AggregateChecksum::from_hex(upper).unwrap();
        assert_eq!(parsed.as_str(), upper.to_ascii_lowercase());

        assert!(AggregateChecksum::from_hex("abc").is_none());
        assert!(AggregateChecksum::from_hex(&"g".repeat(DIGEST_HEX_LEN)).is_none());
    }
}
