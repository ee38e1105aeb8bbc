//! In-memory session values
//!
//! A session is an explicit value threaded through every call that needs a
//! caller identity. There is no global current-user state and nothing is
//! persisted: no session survives the process.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{IdentityId, IdentityProfile};

use super::roles::Role;

/// An authenticated caller
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique id for this session (appears in the audit trail on logout)
    pub session_id: Uuid,

    /// The authenticated identity
    pub identity_id: IdentityId,

    /// Username at login time
    pub username: String,

    /// Role at login time; authorization decisions use this snapshot
    pub role: Role,

    /// When the session was issued (UTC)
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Issue a session for an authenticated identity
    pub fn issue(profile: &IdentityProfile) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            identity_id: profile.id,
            username: profile.username.clone(),
            role: profile.role,
            issued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> IdentityProfile {
        IdentityProfile {
            id: IdentityId::new(),
            username: "alice".into(),
            role: Role::Technician,
            display_name: "Alice".into(),
            active: true,
            last_auth: None,
        }
    }

    #[test]
    fn test_issue_snapshots_identity() {
        let p = profile();
        let session = Session::issue(&p);
        assert_eq!(session.identity_id, p.id);
        assert_eq!(session.username, "alice");
        assert_eq!(session.role, Role::Technician);
    }

    #[test]
    fn test_sessions_are_distinct() {
        let p = profile();
        let a = Session::issue(&p);
        let b = Session::issue(&p);
        assert_ne!(a.session_id, b.session_id);
    }
}
