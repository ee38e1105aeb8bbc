//! Operator identity model
//!
//! An identity is never physically deleted: audit history references
//! identities by id, so removal would orphan the trail. Deactivation flips
//! the `active` flag instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

use super::ids::IdentityId;

/// A stored operator identity, including the password verifier
///
/// The `verifier` field is a PHC-format string (algorithm, salt, and work
/// factors embedded). It must never leave the credential store; collaborators
/// see [`IdentityProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identity ID
    pub id: IdentityId,

    /// Unique username (case-sensitive exact match)
    pub username: String,

    /// Salted password hash in PHC string format
    pub verifier: String,

    /// Role determining the identity's permission set
    pub role: Role,

    /// Human-readable display name
    pub display_name: String,

    /// Whether the identity may authenticate
    pub active: bool,

    /// When the identity was created (UTC)
    pub created_at: DateTime<Utc>,

    /// When the identity last authenticated successfully
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_auth: Option<DateTime<Utc>>,
}

impl Identity {
    /// Create a new active identity with a pre-computed verifier
    pub fn new(
        username: impl Into<String>,
        verifier: String,
        role: Role,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: IdentityId::new(),
            username: username.into(),
            verifier,
            role,
            display_name: display_name.into(),
            active: true,
            created_at: Utc::now(),
            last_auth: None,
        }
    }

    /// Public projection of this identity, without the verifier
    pub fn profile(&self) -> IdentityProfile {
        IdentityProfile {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            display_name: self.display_name.clone(),
            active: self.active,
            last_auth: self.last_auth,
        }
    }
}

/// The identity view exposed to collaborators (UI, session glue)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub id: IdentityId,
    pub username: String,
    pub role: Role,
    pub display_name: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_auth: Option<DateTime<Utc>>,
}
