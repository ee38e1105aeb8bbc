//! Encrypted record model
//!
//! The custody layer is schema-agnostic: the plaintext inside the sealed
//! blob belongs to the caller. This model only carries the external
//! identifier, the opaque ciphertext, and timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RecordId;

/// A logical entity stored as an opaque ciphertext blob
///
/// The ciphertext is base64-encoded for JSON persistence; in memory it is
/// handled as raw bytes. A tombstoned record keeps its external id burned
/// (ids are never reused) but carries no ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedRecord {
    /// Internal record ID
    pub id: RecordId,

    /// Stable caller-supplied identifier (e.g., a patient number)
    pub external_id: String,

    /// Sealed payload (base64 of nonce-prefixed AES-GCM output); None once
    /// the record is tombstoned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sealed: Option<String>,

    /// Whether the record has been logically deleted
    #[serde(default)]
    pub tombstoned: bool,

    /// When the record was created (UTC)
    pub created_at: DateTime<Utc>,

    /// When the record was last updated (UTC)
    pub updated_at: DateTime<Utc>,
}

impl EncryptedRecord {
    /// Create a new record holding sealed ciphertext bytes
    pub fn new(external_id: impl Into<String>, ciphertext: &[u8]) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            external_id: external_id.into(),
            sealed: Some(STANDARD.encode(ciphertext)),
            tombstoned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the sealed payload and bump the update timestamp
    pub fn reseal(&mut self, ciphertext: &[u8]) {
        use base64::{engine::general_purpose::STANDARD, Engine};
        self.sealed = Some(STANDARD.encode(ciphertext));
        self.updated_at = Utc::now();
    }

    /// Drop the ciphertext and burn the external id
    pub fn tombstone(&mut self) {
        self.sealed = None;
        self.tombstoned = true;
        self.updated_at = Utc::now();
    }

    /// Decode the sealed payload back to raw ciphertext bytes
    ///
    /// Returns `None` for tombstoned records; an undecodable blob is
    /// reported as `Err` so the caller can surface it as corruption.
    pub fn ciphertext(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        self.sealed.as_ref().map(|s| STANDARD.decode(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_ciphertext() {
        let record = EncryptedRecord::new("P-100", &[1, 2, 3, 255]);
        let bytes = record.ciphertext().unwrap().unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 255]);
        assert!(!record.tombstoned);
    }

    #[test]
    fn test_reseal_bumps_updated_at() {
        let mut record = EncryptedRecord::new("P-100", &[1, 2, 3]);
        let created = record.created_at;
        record.reseal(&[4, 5, 6]);
        assert!(record.updated_at >= created);
        assert_eq!(record.ciphertext().unwrap().unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn test_tombstone_drops_ciphertext() {
        let mut record = EncryptedRecord::new("P-100", &[1, 2, 3]);
        record.tombstone();
        assert!(record.tombstoned);
        assert!(record.ciphertext().is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let record = EncryptedRecord::new("P-100", b"sealed bytes");
        let json = serde_json::to_string(&record).unwrap();
        let back: EncryptedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.external_id, "P-100");
        assert_eq!(
            back.ciphertext().unwrap().unwrap(),
            record.ciphertext().unwrap().unwrap()
        );
    }
}
