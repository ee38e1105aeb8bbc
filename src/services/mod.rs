//! Service layer: the custody facade and its operation surfaces
//!
//! `Custody` wires paths, settings, key material, repositories, and the
//! audit ledger together, and hands out the per-concern services:
//! `RecordStore` for encrypted CRUD, `IdentityAdmin` for operator
//! lifecycle, and `Authenticator` for login/logout.

pub mod admin;
pub mod records;

pub use admin::IdentityAdmin;
pub use records::RecordStore;

use std::sync::{Arc, Mutex};

use crate::audit::{AuditAction, AuditEntry, AuditFilter, AuditLedger, ResourceType};
use crate::auth::{require, Authenticator, CredentialStore, Permission, Session};
use crate::config::{CustodyPaths, Settings};
use crate::crypto::{EncryptionKey, KeyManager};
use crate::error::CustodyResult;
use crate::storage::{IdentityRepository, RecordRepository};

/// The assembled custody layer
///
/// Owns the single encryption key, the repositories, and the audit ledger.
/// One `Custody` per process; callers thread `Session` values through the
/// services it hands out.
pub struct Custody {
    paths: CustodyPaths,
    settings: Settings,
    key: EncryptionKey,
    records: RecordRepository,
    credentials: CredentialStore,
    ledger: AuditLedger,
    /// Coarse process-wide lock serializing record operations, reads
    /// included, so no read overlaps a mutation in flight
    op_lock: Mutex<()>,
}

impl Custody {
    /// Open the custody layer at the given paths
    ///
    /// Loads or creates settings, obtains the encryption key (generating it
    /// on very first start), loads both repositories, and recovers the audit
    /// ledger's sequence state. Fails with `KeyUnavailable` if key material
    /// exists but is corrupt.
    pub fn open(paths: CustodyPaths) -> CustodyResult<Self> {
        let settings = Settings::load_or_create(&paths)?;
        Self::open_with_settings(paths, settings)
    }

    /// Open with explicit settings (used by tests to lower hash work factors)
    pub fn open_with_settings(paths: CustodyPaths, settings: Settings) -> CustodyResult<Self> {
        paths.ensure_directories()?;

        let key = KeyManager::new(paths.key_file()).obtain_key()?;

        let identities = Arc::new(IdentityRepository::new(paths.identities_file()));
        identities.load()?;

        let records = RecordRepository::new(paths.records_file());
        records.load()?;

        let ledger = AuditLedger::open(paths.audit_log())?;

        let credentials = CredentialStore::new(
            identities,
            settings.password_policy.clone(),
            settings.hashing.clone(),
        )?;

        Ok(Self {
            paths,
            settings,
            key,
            records,
            credentials,
            ledger,
            op_lock: Mutex::new(()),
        })
    }

    /// The record store surface
    pub fn record_store(&self) -> RecordStore<'_> {
        RecordStore::new(&self.records, &self.ledger, &self.key, &self.op_lock)
    }

    /// The authentication surface
    pub fn authenticator(&self) -> Authenticator<'_> {
        Authenticator::new(&self.credentials, &self.ledger)
    }

    /// The identity administration surface
    pub fn identity_admin(&self) -> IdentityAdmin<'_> {
        IdentityAdmin::new(&self.credentials, &self.ledger)
    }

    /// Read-only audit query surface for the admin screen
    ///
    /// Requires `view_audit_logs`. This is the only way collaborators reach
    /// the ledger; there is no insert or mutate surface at all. A denied
    /// attempt to read the trail lands in the trail itself.
    pub fn read_audit(
        &self,
        session: &Session,
        filter: &AuditFilter,
        limit: usize,
    ) -> CustodyResult<Vec<AuditEntry>> {
        if let Err(err) = require(session.role, Permission::ViewAuditLogs) {
            self.ledger.append(
                Some(session.identity_id),
                AuditAction::PermissionDenied,
                ResourceType::Audit,
                "*",
                format!(
                    "role '{}' lacks '{}'",
                    session.role,
                    Permission::ViewAuditLogs
                ),
            )?;
            return Err(err);
        }
        self.ledger.read(filter, limit)
    }

    /// The credential store (verify/rotate surface for session glue)
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// The paths this layer was opened with
    pub fn paths(&self) -> &CustodyPaths {
        &self.paths
    }

    /// The active settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
