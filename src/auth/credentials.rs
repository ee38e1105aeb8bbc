//! Credential store
//!
//! Persists operator identities with salted Argon2id password verifiers.
//! Passwords are never stored; verification recomputes the hash with the
//! salt and work factors embedded in the stored PHC string and compares in
//! constant time. Unknown usernames still burn a hash verification against
//! a dummy verifier so response timing does not reveal which usernames
//! exist.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use chrono::Utc;

use crate::config::settings::{HashingParams, PasswordPolicy};
use crate::crypto::SecureString;
use crate::error::{CustodyError, CustodyResult};
use crate::models::{Identity, IdentityId, IdentityProfile};
use crate::storage::IdentityRepository;

use super::roles::Role;

/// Store of operator identities and their password verifiers
pub struct CredentialStore {
    identities: Arc<IdentityRepository>,
    policy: PasswordPolicy,
    hashing: HashingParams,
    /// Verifier for a throwaway password, used to equalize timing when a
    /// username does not exist
    dummy_verifier: String,
}

impl CredentialStore {
    /// Create a credential store over the identity repository
    pub fn new(
        identities: Arc<IdentityRepository>,
        policy: PasswordPolicy,
        hashing: HashingParams,
    ) -> CustodyResult<Self> {
        let dummy_verifier = hash_password(&SecureString::new("medivault-dummy"), &hashing)?;
        Ok(Self {
            identities,
            policy,
            hashing,
            dummy_verifier,
        })
    }

    /// Create a new identity
    ///
    /// Fails with `DuplicateUsername` if the username is already taken
    /// (case-sensitive exact match). The password must satisfy the policy.
    pub fn create_identity(
        &self,
        username: &str,
        password: &SecureString,
        role: Role,
        display_name: &str,
    ) -> CustodyResult<IdentityId> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CustodyError::Validation("Username cannot be empty".into()));
        }

        self.policy
            .check(password.as_str())
            .map_err(CustodyError::Validation)?;

        if self.identities.username_exists(username)? {
            return Err(CustodyError::DuplicateUsername(username.to_string()));
        }

        let verifier = hash_password(password, &self.hashing)?;
        let identity = Identity::new(username, verifier, role, display_name);
        let id = identity.id;

        self.identities.upsert(identity)?;
        self.identities.save()?;

        Ok(id)
    }

    /// Verify a username/password pair
    ///
    /// Returns true iff the password matches the one supplied at the most
    /// recent successful `create_identity` or `rotate_password` for that
    /// username. Pure with respect to the ledger; audited login goes through
    /// `Authenticator::login`.
    pub fn verify(&self, username: &str, password: &SecureString) -> CustodyResult<bool> {
        match self.identities.get_by_username(username)? {
            Some(identity) => Ok(verify_against(&identity.verifier, password)),
            None => {
                // Equalize timing with the found-user path.
                let _ = verify_against(&self.dummy_verifier, password);
                Ok(false)
            }
        }
    }

    /// Rotate a password: verify-then-replace, never a blind overwrite
    ///
    /// Fails with `AuthFailure` if the old password does not verify, and
    /// with `Validation` if the new password fails the policy.
    pub fn rotate_password(
        &self,
        id: IdentityId,
        old_password: &SecureString,
        new_password: &SecureString,
    ) -> CustodyResult<()> {
        let mut identity = self
            .identities
            .get(id)?
            .ok_or_else(|| CustodyError::identity_not_found(id.to_string()))?;

        if !verify_against(&identity.verifier, old_password) {
            return Err(CustodyError::AuthFailure);
        }

        self.policy
            .check(new_password.as_str())
            .map_err(CustodyError::Validation)?;

        identity.verifier = hash_password(new_password, &self.hashing)?;
        self.identities.upsert(identity)?;
        self.identities.save()?;

        Ok(())
    }

    /// Deactivate an identity
    ///
    /// Identities are never physically deleted: audit history references
    /// them by id, so removal would orphan the trail.
    pub fn deactivate(&self, id: IdentityId) -> CustodyResult<()> {
        self.set_active(id, false)
    }

    /// Reactivate a previously deactivated identity
    pub fn reactivate(&self, id: IdentityId) -> CustodyResult<()> {
        self.set_active(id, true)
    }

    fn set_active(&self, id: IdentityId, active: bool) -> CustodyResult<()> {
        let mut identity = self
            .identities
            .get(id)?
            .ok_or_else(|| CustodyError::identity_not_found(id.to_string()))?;

        identity.active = active;
        self.identities.upsert(identity)?;
        self.identities.save()
    }

    /// Record a successful authentication on the identity
    pub fn touch_last_auth(&self, id: IdentityId) -> CustodyResult<()> {
        let mut identity = self
            .identities
            .get(id)?
            .ok_or_else(|| CustodyError::identity_not_found(id.to_string()))?;

        identity.last_auth = Some(Utc::now());
        self.identities.upsert(identity)?;
        self.identities.save()
    }

    /// Look up the stored identity for a username (verifier included);
    /// crate-internal, used by the authenticator
    pub(crate) fn lookup(&self, username: &str) -> CustodyResult<Option<Identity>> {
        self.identities.get_by_username(username)
    }

    /// Look up the stored identity by id (verifier included); crate-internal
    pub(crate) fn lookup_by_id(&self, id: IdentityId) -> CustodyResult<Option<Identity>> {
        self.identities.get(id)
    }

    /// Restore a previously captured identity state; crate-internal, used to
    /// roll back a mutation whose audit entry could not be written
    pub(crate) fn restore(&self, identity: Identity) -> CustodyResult<()> {
        self.identities.upsert(identity)?;
        self.identities.save()
    }

    /// Discard a never-audited identity; crate-internal rollback for
    /// `create_identity` when the audit append fails
    pub(crate) fn discard(&self, id: IdentityId) -> CustodyResult<()> {
        self.identities.remove(id)?;
        self.identities.save()
    }

    /// Public projection of an identity by id
    pub fn profile(&self, id: IdentityId) -> CustodyResult<Option<IdentityProfile>> {
        Ok(self.identities.get(id)?.map(|i| i.profile()))
    }

    /// Public projections of all identities
    pub fn profiles(&self) -> CustodyResult<Vec<IdentityProfile>> {
        Ok(self
            .identities
            .get_all()?
            .iter()
            .map(Identity::profile)
            .collect())
    }

    /// Whether the store holds no identities yet (pre-bootstrap)
    pub fn is_empty(&self) -> CustodyResult<bool> {
        self.identities.is_empty()
    }
}

/// Hash a password into a PHC string with the configured work factors
fn hash_password(password: &SecureString, hashing: &HashingParams) -> CustodyResult<String> {
    let params = Params::new(
        hashing.memory_cost,
        hashing.time_cost,
        hashing.parallelism,
        None,
    )
    .map_err(|e| CustodyError::Validation(format!("Invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| CustodyError::Storage(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Constant-time verification of a password against a PHC verifier
///
/// The salt and work factors come from the verifier string itself, and the
/// underlying comparison never branches on a prefix match.
fn verify_against(verifier: &str, password: &SecureString) -> bool {
    let Ok(parsed) = PasswordHash::new(verifier) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (CredentialStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(IdentityRepository::new(
            temp_dir.path().join("identities.json"),
        ));
        let store = CredentialStore::new(
            repo,
            PasswordPolicy::default(),
            HashingParams::fast_insecure(),
        )
        .unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_create_and_verify() {
        let (store, _temp) = test_store();

        store
            .create_identity(
                "alice",
                &SecureString::new("Sup3r$ecret!"),
                Role::Technician,
                "Alice",
            )
            .unwrap();

        assert!(store
            .verify("alice", &SecureString::new("Sup3r$ecret!"))
            .unwrap());
        assert!(!store.verify("alice", &SecureString::new("wrong")).unwrap());
    }

    #[test]
    fn test_verify_unknown_user_returns_false() {
        let (store, _temp) = test_store();
        assert!(!store
            .verify("nobody", &SecureString::new("whatever"))
            .unwrap());
    }

    #[test]
    fn test_username_match_is_case_sensitive() {
        let (store, _temp) = test_store();

        store
            .create_identity(
                "alice",
                &SecureString::new("Sup3r$ecret!"),
                Role::Technician,
                "Alice",
            )
            .unwrap();

        assert!(!store
            .verify("Alice", &SecureString::new("Sup3r$ecret!"))
            .unwrap());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (store, _temp) = test_store();

        store
            .create_identity("alice", &SecureString::new("password1"), Role::Admin, "A")
            .unwrap();

        let err = store
            .create_identity("alice", &SecureString::new("password2"), Role::Admin, "A")
            .unwrap_err();
        assert!(matches!(err, CustodyError::DuplicateUsername(u) if u == "alice"));
    }

    #[test]
    fn test_password_policy_enforced_on_create() {
        let (store, _temp) = test_store();

        let err = store
            .create_identity("bob", &SecureString::new("short"), Role::Admin, "Bob")
            .unwrap_err();
        assert!(matches!(err, CustodyError::Validation(_)));
    }

    #[test]
    fn test_rotate_password_requires_old() {
        let (store, _temp) = test_store();

        let id = store
            .create_identity(
                "alice",
                &SecureString::new("old-password"),
                Role::Technician,
                "Alice",
            )
            .unwrap();

        // Wrong old password: rejected, verifier unchanged
        let err = store
            .rotate_password(
                id,
                &SecureString::new("not-the-old"),
                &SecureString::new("new-password"),
            )
            .unwrap_err();
        assert!(matches!(err, CustodyError::AuthFailure));
        assert!(store
            .verify("alice", &SecureString::new("old-password"))
            .unwrap());

        // Correct old password: replaced
        store
            .rotate_password(
                id,
                &SecureString::new("old-password"),
                &SecureString::new("new-password"),
            )
            .unwrap();
        assert!(!store
            .verify("alice", &SecureString::new("old-password"))
            .unwrap());
        assert!(store
            .verify("alice", &SecureString::new("new-password"))
            .unwrap());
    }

    #[test]
    fn test_rotate_rejects_weak_new_password() {
        let (store, _temp) = test_store();

        let id = store
            .create_identity(
                "alice",
                &SecureString::new("old-password"),
                Role::Technician,
                "Alice",
            )
            .unwrap();

        let err = store
            .rotate_password(id, &SecureString::new("old-password"), &SecureString::new("x"))
            .unwrap_err();
        assert!(matches!(err, CustodyError::Validation(_)));
        assert!(store
            .verify("alice", &SecureString::new("old-password"))
            .unwrap());
    }

    #[test]
    fn test_deactivate_keeps_identity_resolvable() {
        let (store, _temp) = test_store();

        let id = store
            .create_identity(
                "alice",
                &SecureString::new("Sup3r$ecret!"),
                Role::Technician,
                "Alice",
            )
            .unwrap();

        store.deactivate(id).unwrap();

        let profile = store.profile(id).unwrap().unwrap();
        assert!(!profile.active);
        assert_eq!(profile.username, "alice");

        store.reactivate(id).unwrap();
        assert!(store.profile(id).unwrap().unwrap().active);
    }

    #[test]
    fn test_verifier_never_in_profiles() {
        let (store, _temp) = test_store();

        store
            .create_identity(
                "alice",
                &SecureString::new("Sup3r$ecret!"),
                Role::Technician,
                "Alice",
            )
            .unwrap();

        let profiles = store.profiles().unwrap();
        let json = serde_json::to_string(&profiles).unwrap();
        assert!(!json.contains("argon2"));
    }
}
