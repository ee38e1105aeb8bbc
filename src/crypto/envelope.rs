//! AES-256-GCM cipher envelope
//!
//! Seals and opens opaque byte payloads with authenticated encryption. Each
//! seal generates a fresh random nonce, so identical plaintexts never
//! produce identical ciphertexts. The nonce is prepended to the sealed
//! output; `open` strips it and authenticates the remainder.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use aes_gcm::aead::rand_core::RngCore;

use crate::error::{CustodyError, CustodyResult};

use super::key_manager::EncryptionKey;

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Encrypt a plaintext payload using AES-256-GCM
///
/// Returns `nonce || ciphertext+tag` as one opaque byte string. Generates a
/// random nonce for each call.
pub fn seal(key: &EncryptionKey, plaintext: &[u8]) -> CustodyResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CustodyError::Storage(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CustodyError::Storage(format!("Encryption failed: {}", e)))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a sealed payload using AES-256-GCM
///
/// # Errors
///
/// `IntegrityViolation` if the payload is too short to carry a nonce, has
/// been tampered with at any bit position, or was sealed under a different
/// key. Never returns altered plaintext.
pub fn open(key: &EncryptionKey, sealed: &[u8]) -> CustodyResult<Vec<u8>> {
    if sealed.len() < NONCE_SIZE {
        return Err(CustodyError::IntegrityViolation);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CustodyError::Storage(format!("Failed to create cipher: {}", e)))?;

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CustodyError::IntegrityViolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_manager::KEY_SIZE;

    fn test_key() -> EncryptionKey {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        EncryptionKey::from_bytes(bytes)
    }

    #[test]
    fn test_seal_open_round_trip() {
        let key = test_key();
        let plaintext = b"name=Jane Doe";

        let sealed = seal(&key, plaintext).unwrap();
        let opened = open(&key, &sealed).unwrap();

        assert_eq!(plaintext.as_slice(), opened.as_slice());
    }

    #[test]
    fn test_empty_plaintext_round_trips() {
        let key = test_key();
        let sealed = seal(&key, b"").unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_multi_block_plaintext_round_trips() {
        let key = test_key();
        let plaintext: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();

        let sealed = seal(&key, &plaintext).unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), plaintext);
    }

    #[test]
    fn test_nonce_freshness() {
        let key = test_key();
        let plaintext = b"same bytes";

        // Repeated seals of the same plaintext must differ
        let sealed1 = seal(&key, plaintext).unwrap();
        let sealed2 = seal(&key, plaintext).unwrap();
        assert_ne!(sealed1, sealed2);

        // And different plaintexts must differ too
        let sealed3 = seal(&key, b"other bytes").unwrap();
        assert_ne!(sealed1, sealed3);
    }

    #[test]
    fn test_every_bit_flip_detected() {
        let key = test_key();
        let sealed = seal(&key, b"tamper target").unwrap();

        for byte_idx in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte_idx] ^= 1 << bit;

                match open(&key, &tampered) {
                    Err(CustodyError::IntegrityViolation) => {}
                    other => panic!(
                        "bit {} of byte {} not detected: {:?}",
                        bit,
                        byte_idx,
                        other.map(|p| p.len())
                    ),
                }
            }
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = test_key();
        let key2 = test_key();

        let sealed = seal(&key1, b"secret").unwrap();
        assert!(matches!(
            open(&key2, &sealed),
            Err(CustodyError::IntegrityViolation)
        ));
    }

    #[test]
    fn test_truncated_payload_fails() {
        let key = test_key();
        assert!(matches!(
            open(&key, &[0u8; 5]),
            Err(CustodyError::IntegrityViolation)
        ));
    }
}
