//! Identity repository for JSON storage
//!
//! Manages loading and saving identities to identities.json. Username
//! lookups are case-sensitive exact matches; the uniqueness invariant lives
//! in the credential store, which checks before inserting.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::CustodyError;
use crate::models::{Identity, IdentityId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable identity data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct IdentityData {
    identities: Vec<Identity>,
}

/// Repository for identity persistence
pub struct IdentityRepository {
    path: PathBuf,
    data: RwLock<HashMap<IdentityId, Identity>>,
}

impl IdentityRepository {
    /// Create a new identity repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load identities from disk
    pub fn load(&self) -> Result<(), CustodyError> {
        let file_data: IdentityData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for identity in file_data.identities {
            data.insert(identity.id, identity);
        }

        Ok(())
    }

    /// Save identities to disk
    pub fn save(&self) -> Result<(), CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut identities: Vec<_> = data.values().cloned().collect();
        identities.sort_by(|a, b| a.username.cmp(&b.username));

        write_json_atomic(&self.path, &IdentityData { identities })
    }

    /// Get an identity by ID
    pub fn get(&self, id: IdentityId) -> Result<Option<Identity>, CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get an identity by username (case-sensitive exact match)
    pub fn get_by_username(&self, username: &str) -> Result<Option<Identity>, CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.values().find(|i| i.username == username).cloned())
    }

    /// Check whether a username is taken (case-sensitive exact match)
    pub fn username_exists(&self, username: &str) -> Result<bool, CustodyError> {
        Ok(self.get_by_username(username)?.is_some())
    }

    /// Get all identities, sorted by username
    pub fn get_all(&self) -> Result<Vec<Identity>, CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut identities: Vec<_> = data.values().cloned().collect();
        identities.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(identities)
    }

    /// Check whether the repository holds no identities
    pub fn is_empty(&self) -> Result<bool, CustodyError> {
        let data = self
            .data
            .read()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.is_empty())
    }

    /// Remove an identity from the in-memory map
    ///
    /// Only used to roll back an identity creation whose audit entry could
    /// not be written; established identities are deactivated, never removed.
    pub(crate) fn remove(&self, id: IdentityId) -> Result<Option<Identity>, CustodyError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        Ok(data.remove(&id))
    }

    /// Insert or replace an identity
    pub fn upsert(&self, identity: Identity) -> Result<(), CustodyError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| CustodyError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(identity.id, identity);
        Ok(())
    }
}
