//! Identity administration
//!
//! Admin-gated lifecycle operations on operator identities. Like the record
//! store, every mutation here is transactional with its audit entry: a
//! created identity whose `IDENTITY_CREATED` entry cannot be written is
//! discarded again, and a deactivation whose entry fails is undone.

use crate::audit::{AuditAction, AuditLedger, ResourceType};
use crate::auth::{require, CredentialStore, Permission, Role, Session};
use crate::crypto::SecureString;
use crate::error::{CustodyError, CustodyResult};
use crate::models::{IdentityId, IdentityProfile};

/// Permission-gated identity lifecycle operations
pub struct IdentityAdmin<'a> {
    credentials: &'a CredentialStore,
    ledger: &'a AuditLedger,
}

impl<'a> IdentityAdmin<'a> {
    /// Create an identity admin over the credential store and audit ledger
    pub fn new(credentials: &'a CredentialStore, ledger: &'a AuditLedger) -> Self {
        Self {
            credentials,
            ledger,
        }
    }

    /// Create a new operator identity
    ///
    /// Requires `add_users`. Appends `IDENTITY_CREATED` on success and
    /// `PERMISSION_DENIED` on denial.
    pub fn create_identity(
        &self,
        session: &Session,
        username: &str,
        password: &SecureString,
        role: Role,
        display_name: &str,
    ) -> CustodyResult<IdentityId> {
        if let Err(err) = require(session.role, Permission::AddUsers) {
            return Err(self.audit_denial(session, username, Permission::AddUsers, err)?);
        }

        let id = self
            .credentials
            .create_identity(username, password, role, display_name)?;

        let append = self.ledger.append(
            Some(session.identity_id),
            AuditAction::IdentityCreated,
            ResourceType::Identity,
            username,
            format!("role {}", role),
        );
        if let Err(err) = append {
            // Never audited, so it never existed.
            self.credentials.discard(id)?;
            return Err(err);
        }

        Ok(id)
    }

    /// Deactivate an identity
    ///
    /// Requires `edit_users`. The identity stays resolvable for the audit
    /// trail; only its ability to authenticate is revoked.
    pub fn deactivate(&self, session: &Session, id: IdentityId) -> CustodyResult<()> {
        // Permission first: an unprivileged caller must not learn whether
        // the id exists.
        if let Err(err) = require(session.role, Permission::EditUsers) {
            return Err(self.audit_denial(session, &id.to_string(), Permission::EditUsers, err)?);
        }

        let target = self
            .credentials
            .profile(id)?
            .ok_or_else(|| CustodyError::identity_not_found(id.to_string()))?;

        self.credentials.deactivate(id)?;

        let append = self.ledger.append(
            Some(session.identity_id),
            AuditAction::IdentityDeactivated,
            ResourceType::Identity,
            target.username.clone(),
            "identity deactivated",
        );
        if let Err(err) = append {
            self.credentials.reactivate(id)?;
            return Err(err);
        }

        Ok(())
    }

    /// Rotate the session holder's own password (verify-then-replace)
    ///
    /// Appends `PASSWORD_ROTATED`; the rotation is undone if the entry
    /// cannot be written.
    pub fn rotate_password(
        &self,
        session: &Session,
        old_password: &SecureString,
        new_password: &SecureString,
    ) -> CustodyResult<()> {
        let before = self
            .credentials
            .lookup_by_id(session.identity_id)?
            .ok_or_else(|| CustodyError::identity_not_found(session.identity_id.to_string()))?;

        self.credentials
            .rotate_password(session.identity_id, old_password, new_password)?;

        let append = self.ledger.append(
            Some(session.identity_id),
            AuditAction::PasswordRotated,
            ResourceType::Identity,
            session.username.clone(),
            "password rotated",
        );
        if let Err(err) = append {
            self.credentials.restore(before)?;
            return Err(err);
        }

        Ok(())
    }

    /// List identity profiles (verifiers never included)
    ///
    /// Requires `view_users`; denials are audited like every other denial.
    pub fn list(&self, session: &Session) -> CustodyResult<Vec<IdentityProfile>> {
        if let Err(err) = require(session.role, Permission::ViewUsers) {
            return Err(self.audit_denial(session, "*", Permission::ViewUsers, err)?);
        }
        self.credentials.profiles()
    }

    /// Seed the first administrator when the credential store is empty
    ///
    /// System-initiated: the audit entry carries no actor. Refuses to run
    /// once any identity exists.
    pub fn bootstrap_admin(
        &self,
        username: &str,
        password: &SecureString,
        display_name: &str,
    ) -> CustodyResult<IdentityId> {
        if !self.credentials.is_empty()? {
            return Err(CustodyError::Validation(
                "Bootstrap is only allowed on an empty credential store".into(),
            ));
        }

        let id = self
            .credentials
            .create_identity(username, password, Role::Admin, display_name)?;

        let append = self.ledger.append(
            None,
            AuditAction::IdentityCreated,
            ResourceType::Identity,
            username,
            "bootstrap administrator",
        );
        if let Err(err) = append {
            self.credentials.discard(id)?;
            return Err(err);
        }

        Ok(id)
    }

    fn audit_denial(
        &self,
        session: &Session,
        username: &str,
        permission: Permission,
        err: CustodyError,
    ) -> CustodyResult<CustodyError> {
        self.ledger.append(
            Some(session.identity_id),
            AuditAction::PermissionDenied,
            ResourceType::Identity,
            username,
            format!("role '{}' lacks '{}'", session.role, permission),
        )?;
        Ok(err)
    }
}
