//! Custom error types for the custody layer
//!
//! This module defines the error hierarchy for the custody layer using
//! thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::auth::{Permission, Role};

/// The main error type for custody-layer operations
#[derive(Error, Debug)]
pub enum CustodyError {
    /// Key material exists but is unreadable or corrupt. Fatal at startup;
    /// the layer never falls back to a default key.
    #[error("Encryption key unavailable: {0}")]
    KeyUnavailable(String),

    /// Ciphertext failed authentication: tampered, truncated, or sealed
    /// under a different key. Fatal for the record, not the process.
    #[error("Integrity violation: ciphertext failed authentication")]
    IntegrityViolation,

    /// Username already taken (case-sensitive exact match)
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    /// Generic authentication failure. The precise reason (unknown user,
    /// inactive identity, wrong password) goes to the audit ledger only.
    #[error("Authentication failed")]
    AuthFailure,

    /// The caller's role does not grant the required permission
    #[error("Permission denied: role '{role}' lacks '{permission}'")]
    PermissionDenied { role: Role, permission: Permission },

    /// The audit entry could not be durably written. Fatal to the enclosing
    /// operation; any mutation it would have described is rolled back.
    #[error("Audit write failed: {0}")]
    AuditWriteFailed(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors for inputs and models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },
}

impl CustodyError {
    /// Create a "not found" error for identities
    pub fn identity_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Identity",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for records
    pub fn record_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Record",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a permission denial
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for CustodyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CustodyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for custody-layer operations
pub type CustodyResult<T> = Result<T, CustodyError>;
