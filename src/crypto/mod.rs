//! Cryptographic core of the custody layer
//!
//! Provides the symmetric key lifecycle (generate once, load thereafter) and
//! the AES-256-GCM cipher envelope used to seal record payloads at rest.

pub mod envelope;
pub mod key_manager;
pub mod secure_memory;

pub use envelope::{open, seal};
pub use key_manager::{EncryptionKey, KeyManager};
pub use secure_memory::SecureString;
