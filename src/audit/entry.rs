//! Audit entry data structures
//!
//! Defines the structure of audit log entries including action verbs,
//! resource types, and the entry format itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::IdentityId;

/// Action verbs that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Operator authenticated successfully
    LoginSuccess,
    /// Authentication attempt rejected (reason in detail, never in the
    /// error returned to the caller)
    LoginFailure,
    /// Session ended
    LoginEnd,
    /// Record created
    Create,
    /// Record payload read
    Read,
    /// Record updated
    Update,
    /// Record logically deleted
    Delete,
    /// Record store scanned with a caller predicate
    Search,
    /// An operation was refused by the authorizer
    PermissionDenied,
    /// New identity registered
    IdentityCreated,
    /// Password rotated via verify-then-replace
    PasswordRotated,
    /// Identity deactivated (never physically deleted)
    IdentityDeactivated,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::LoginSuccess => "LOGIN_SUCCESS",
            AuditAction::LoginFailure => "LOGIN_FAILURE",
            AuditAction::LoginEnd => "LOGIN_END",
            AuditAction::Create => "CREATE",
            AuditAction::Read => "READ",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Search => "SEARCH",
            AuditAction::PermissionDenied => "PERMISSION_DENIED",
            AuditAction::IdentityCreated => "IDENTITY_CREATED",
            AuditAction::PasswordRotated => "PASSWORD_ROTATED",
            AuditAction::IdentityDeactivated => "IDENTITY_DEACTIVATED",
        };
        write!(f, "{}", s)
    }
}

/// Types of resources that can appear in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Record,
    Identity,
    Session,
    /// The audit trail itself (denied attempts to read it)
    Audit,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Record => write!(f, "Record"),
            ResourceType::Identity => write!(f, "Identity"),
            ResourceType::Session => write!(f, "Session"),
            ResourceType::Audit => write!(f, "Audit"),
        }
    }
}

/// A single audit log entry
///
/// Entries are appended, never mutated or removed. The sequence position is
/// the sole ordering authority; the timestamp is informational (wall-clock
/// skew must never reorder the log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the ledger, strictly monotonically increasing, gap-free
    pub sequence: u64,

    /// Acting identity; None for system-initiated actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<IdentityId>,

    /// What happened
    pub action: AuditAction,

    /// Type of resource affected
    pub resource_type: ResourceType,

    /// Identifier of the affected resource (external record id, username, ...)
    pub resource_id: String,

    /// Free-text detail; internal diagnostics go here, never to the caller
    pub detail: String,

    /// When the event occurred (UTC)
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Format the entry for human-readable output (admin audit screen)
    pub fn format_human_readable(&self) -> String {
        let actor = self
            .actor
            .map(|id| id.to_string())
            .unwrap_or_else(|| "system".to_string());

        format!(
            "#{} [{}] {} {} {} ({}) - {}",
            self.sequence,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            actor,
            self.action,
            self.resource_type,
            self.resource_id,
            self.detail
        )
    }
}
