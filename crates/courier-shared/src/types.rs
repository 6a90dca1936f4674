use serde::{Deserialize, Serialize};

use crate::constants::{BATCH_ID_HEX_LEN, PLACEHOLDER_BATCH_ID, REFERENCE_HEX_LEN};
use crate::error::ValidationError;

/// Returns `true` when `s` is a well-formed content reference:
/// exactly 64 hex characters, either case.
pub fn is_valid_reference(s: &str) -> bool {
    s.len() == REFERENCE_HEX_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}

// Content reference = BLAKE3 hash of the blob (32 bytes)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SwarmReference(pub [u8; 32]);

impl SwarmReference {
    /// Parse a reference from its 64-hex-char form. Rejects anything
    /// else before a store or fetch is attempted.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        if !is_valid_reference(s) {
            return Err(ValidationError::InvalidReference(s.to_string()));
        }
        let bytes = hex::decode(s)
            .map_err(|_| ValidationError::InvalidReference(s.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn for_content(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl std::fmt::Display for SwarmReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Postage stamp batch id: `0x` followed by 64 hex characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| ValidationError::InvalidBatchId(s.to_string()))?;
        if hex_part.len() != BATCH_ID_HEX_LEN
            || !hex_part.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ValidationError::InvalidBatchId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The zero-filled batch id substituted when sponsorship fails.
    pub fn placeholder() -> Self {
        Self(PLACEHOLDER_BATCH_ID.to_string())
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_BATCH_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable identity name. Immutable once registered; used to
/// address mailboxes and resolve recipients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Subdomain(String);

impl Subdomain {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let ok = !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !ok {
            return Err(ValidationError::InvalidSubdomain(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Subdomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an upload action does with the file once stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadMode {
    /// Encrypt for a recipient and deliver to their mailbox.
    Send,
    /// Encrypt for self and register in the owner's stored-file manifest.
    Store,
    /// Store unencrypted; the reference is handed straight back.
    Quick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_validation() {
        assert!(is_valid_reference(&"a".repeat(64)));
        assert!(is_valid_reference(&"A".repeat(64)));
        assert!(is_valid_reference(
            "0123456789abcdefABCDEF0123456789abcdefABCDEF0123456789abcdef0123"
        ));
        assert!(!is_valid_reference(&"g".repeat(64)));
        assert!(!is_valid_reference("abc"));
        assert!(!is_valid_reference(&"a".repeat(63)));
        assert!(!is_valid_reference(&"a".repeat(65)));
        assert!(!is_valid_reference(""));
    }

    #[test]
    fn test_reference_hex_roundtrip() {
        let reference = SwarmReference::for_content(b"some bytes");
        let parsed = SwarmReference::from_hex(&reference.to_hex()).unwrap();
        assert_eq!(reference, parsed);
    }

    #[test]
    fn test_reference_accepts_uppercase_hex() {
        let upper = "AB".repeat(32);
        assert!(SwarmReference::from_hex(&upper).is_ok());
    }

    #[test]
    fn test_reference_rejects_invalid() {
        assert!(SwarmReference::from_hex("abc").is_err());
        assert!(SwarmReference::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_batch_id_requires_prefix_and_length() {
        assert!(BatchId::new(&format!("0x{}", "ab".repeat(32))).is_ok());
        assert!(BatchId::new(&"ab".repeat(32)).is_err());
        assert!(BatchId::new("0xabcd").is_err());
        assert!(BatchId::new(&format!("0x{}", "zz".repeat(32))).is_err());
    }

    #[test]
    fn test_placeholder_batch_id() {
        let placeholder = BatchId::placeholder();
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.as_str().len(), 2 + 64);
        assert!(!BatchId::new(&format!("0x{}", "ab".repeat(32)))
            .unwrap()
            .is_placeholder());
    }

    #[test]
    fn test_subdomain_validation() {
        assert!(Subdomain::new("bob").is_ok());
        assert!(Subdomain::new("bob-42").is_ok());
        assert!(Subdomain::new("").is_err());
        assert!(Subdomain::new("Bob").is_err());
        assert!(Subdomain::new("bob.smith").is_err());
    }
}
