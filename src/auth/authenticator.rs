//! Authenticator: login and logout with audited outcomes
//!
//! Every login attempt appends exactly one audit entry. On failure the
//! caller gets the one generic `AuthFailure` no matter what went wrong;
//! the real reason (unknown user, inactive identity, wrong password) is
//! recorded only in the ledger, so the API cannot be used to enumerate
//! usernames.

use crate::audit::{AuditAction, AuditLedger, ResourceType};
use crate::crypto::SecureString;
use crate::error::{CustodyError, CustodyResult};

use super::credentials::CredentialStore;
use super::session::Session;

/// Verifies credentials and issues in-memory sessions
pub struct Authenticator<'a> {
    credentials: &'a CredentialStore,
    ledger: &'a AuditLedger,
}

impl<'a> Authenticator<'a> {
    /// Create an authenticator over the credential store and audit ledger
    pub fn new(credentials: &'a CredentialStore, ledger: &'a AuditLedger) -> Self {
        Self {
            credentials,
            ledger,
        }
    }

    /// Authenticate a username/password pair and issue a session
    ///
    /// On success: updates the identity's last-authentication timestamp and
    /// appends `LOGIN_SUCCESS`. On any failure: appends `LOGIN_FAILURE` with
    /// the reason in the detail field and returns the generic `AuthFailure`.
    pub fn login(&self, username: &str, password: &SecureString) -> CustodyResult<Session> {
        let identity = match self.credentials.lookup(username)? {
            Some(identity) => identity,
            None => {
                // Burn a verification anyway so timing stays flat.
                let _ = self.credentials.verify(username, password);
                return self.fail(username, "unknown username");
            }
        };

        if !identity.active {
            return self.fail(username, "inactive identity");
        }

        if !self.credentials.verify(username, password)? {
            return self.fail(username, "wrong password");
        }

        self.credentials.touch_last_auth(identity.id)?;

        self.ledger.append(
            Some(identity.id),
            AuditAction::LoginSuccess,
            ResourceType::Identity,
            username,
            format!("authenticated as {}", identity.role),
        )?;

        // Re-read so the session reflects the touched last_auth.
        let profile = self
            .credentials
            .profile(identity.id)?
            .ok_or_else(|| CustodyError::identity_not_found(username))?;

        Ok(Session::issue(&profile))
    }

    /// End a session
    ///
    /// Consumes the session value; nothing outlives the call. Appends
    /// `LOGIN_END`.
    pub fn logout(&self, session: Session) -> CustodyResult<()> {
        self.ledger.append(
            Some(session.identity_id),
            AuditAction::LoginEnd,
            ResourceType::Session,
            session.session_id.to_string(),
            format!("session ended for {}", session.username),
        )?;
        Ok(())
    }

    fn fail(&self, username: &str, reason: &str) -> CustodyResult<Session> {
        self.ledger.append(
            None,
            AuditAction::LoginFailure,
            ResourceType::Identity,
            username,
            reason,
        )?;
        Err(CustodyError::AuthFailure)
    }
}
