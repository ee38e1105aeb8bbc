//! Record repository for JSON storage
//!
//! Manages loading and saving encrypted records to records.json, keyed by
//! the caller-supplied external identifier. Tombstoned records stay in the
//! map so their external ids can never be reused.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::CustodyError;
use crate::models::EncryptedRecord;

use super::file_io::{read_json, write_json_atomic};

/// Serializable record data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct RecordData {
    records: Vec<EncryptedRecord>,
}

/// Repository for encrypted record persistence
pub struct RecordRepository {
    path: PathBuf,
    data: RwLock<HashMap<String, EncryptedRecord>>,
}

impl RecordRepository {
    /// Create a new record repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load records from disk
    pub fn load(&self) -> Result<(), CustodyError> {
        let file_data: RecordData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for record in file_data.records {
            data.insert(record.external_id.clone(), record);
        }

        Ok(())
    }

    /// Save records to disk
    pub fn save(&self) -> Result<(), CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut records: Vec<_> = data.values().cloned().collect();
        records.sort_by(|a, b| a.external_id.cmp(&b.external_id));

        write_json_atomic(&self.path, &RecordData { records })
    }

    /// Get a record by external ID (including tombstones)
    pub fn get(&self, external_id: &str) -> Result<Option<EncryptedRecord>, CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(external_id).cloned())
    }

    /// Get all live (non-tombstoned) records, sorted by external ID
    pub fn get_live(&self) -> Result<Vec<EncryptedRecord>, CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut records: Vec<_> = data.values().filter(|r| !r.tombstoned).cloned().collect();
        records.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(records)
    }

    /// Insert or replace a record
    pub fn upsert(&self, record: EncryptedRecord) -> Result<(), CustodyError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(record.external_id.clone(), record);
        Ok(())
    }

    /// Remove a record from the in-memory map
    ///
    /// Only used to roll back a failed insert inside a transaction; logical
    /// deletion goes through tombstoning, never through this.
    pub(crate) fn remove(&self, external_id: &str) -> Result<Option<EncryptedRecord>, CustodyError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        Ok(data.remove(external_id))
    }
}
