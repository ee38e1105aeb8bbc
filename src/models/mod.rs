//! Core data models for the custody layer
//!
//! This module contains the data structures the custody layer persists:
//! operator identities and encrypted records.

pub mod ids;
pub mod identity;
pub mod record;

pub use identity::{Identity, IdentityProfile};
pub use ids::{IdentityId, RecordId};
pub use record::EncryptedRecord;
