//! Symmetric key lifecycle
//!
//! The custody layer runs a single-key regime: one 256-bit key, generated on
//! first use, persisted outside the record store, loaded unchanged on every
//! later start. A key file that exists but is the wrong length is fatal
//! (`KeyUnavailable`); the layer never substitutes a default key.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CustodyError, CustodyResult};

/// Key length for AES-256-GCM
pub const KEY_SIZE: usize = 32;

/// A loaded symmetric encryption key
///
/// Zeroed on drop so key material does not linger in memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Wrap raw key bytes
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey").finish_non_exhaustive()
    }
}

/// Owns the key file and serializes first-time key creation
pub struct KeyManager {
    key_path: PathBuf,
    // Serializes create-vs-create within this process; across processes the
    // create_new open below is the arbiter.
    create_lock: Mutex<()>,
}

impl KeyManager {
    /// Create a key manager for the given key file path
    pub fn new(key_path: PathBuf) -> Self {
        Self {
            key_path,
            create_lock: Mutex::new(()),
        }
    }

    /// Load the persisted key, generating and persisting it on first use
    ///
    /// Concurrent first callers cannot produce two different keys: creation
    /// goes through `create_new`, and the loser of that race re-reads the
    /// winner's file.
    ///
    /// # Errors
    ///
    /// `KeyUnavailable` if the key file exists but cannot be read or has the
    /// wrong length.
    pub fn obtain_key(&self) -> CustodyResult<EncryptionKey> {
        let _guard = self
            .create_lock
            .lock()
            .map_err(|e| CustodyError::KeyUnavailable(format!("Key lock poisoned: {}", e)))?;

        if self.key_path.exists() {
            return self.load_key();
        }

        if let Some(parent) = self.key_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CustodyError::KeyUnavailable(format!("Failed to create key directory: {}", e))
            })?;
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key_bytes);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.key_path)
        {
            Ok(mut file) => {
                file.write_all(&key_bytes).map_err(|e| {
                    CustodyError::KeyUnavailable(format!("Failed to write key file: {}", e))
                })?;
                file.sync_all().map_err(|e| {
                    CustodyError::KeyUnavailable(format!("Failed to sync key file: {}", e))
                })?;
                Ok(EncryptionKey::from_bytes(key_bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Another caller won the creation race; use their key.
                key_bytes.zeroize();
                self.load_key()
            }
            Err(e) => Err(CustodyError::KeyUnavailable(format!(
                "Failed to create key file: {}",
                e
            ))),
        }
    }

    /// Check whether key material has been persisted
    pub fn key_exists(&self) -> bool {
        self.key_path.exists()
    }

    fn load_key(&self) -> CustodyResult<EncryptionKey> {
        let bytes = fs::read(&self.key_path)
            .map_err(|e| CustodyError::KeyUnavailable(format!("Failed to read key file: {}", e)))?;

        if bytes.len() != KEY_SIZE {
            return Err(CustodyError::KeyUnavailable(format!(
                "Key file has wrong length: expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(&bytes);
        Ok(EncryptionKey::from_bytes(key_bytes))
    }
}
