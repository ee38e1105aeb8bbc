//! Record store: the CRUD surface over encrypted entities
//!
//! Every operation takes the caller's session, asks the grant table whether
//! the caller's role may perform it, moves payloads through the cipher
//! envelope, and appends exactly one audit entry. On denial the entry
//! records the denial itself and the ciphertext store is left untouched.
//!
//! Mutations are transactional: the record write and the audit append
//! succeed or fail together. If the audit entry cannot be durably written,
//! the mutation is rolled back and `AuditWriteFailed` returned, so no
//! sensitive mutation ever exists without a corresponding audit entry.

use std::sync::Mutex;

use crate::audit::{AuditAction, AuditLedger, ResourceType};
use crate::auth::{require, Permission, Session};
use crate::crypto::{self, EncryptionKey};
use crate::error::{CustodyError, CustodyResult};
use crate::models::{EncryptedRecord, RecordId};
use crate::storage::RecordRepository;

/// CRUD surface over encrypted records
pub struct RecordStore<'a> {
    records: &'a RecordRepository,
    ledger: &'a AuditLedger,
    key: &'a EncryptionKey,
    /// Serializes every record operation, reads included, so a read can
    /// never observe a mutation that is still in flight (coarse-grained:
    /// correctness over throughput; the expected load is one desktop
    /// process)
    op_lock: &'a Mutex<()>,
}

impl<'a> RecordStore<'a> {
    /// Create a record store over shared custody infrastructure
    pub fn new(
        records: &'a RecordRepository,
        ledger: &'a AuditLedger,
        key: &'a EncryptionKey,
        op_lock: &'a Mutex<()>,
    ) -> Self {
        Self {
            records,
            ledger,
            key,
            op_lock,
        }
    }

    /// Create or update a record
    ///
    /// Requires `add_patients` for a new external id, `edit_patients` for an
    /// existing one. Seals the payload, persists the ciphertext, and appends
    /// `CREATE` or `UPDATE` as one transaction. A tombstoned external id can
    /// never be written again.
    pub fn put(
        &self,
        session: &Session,
        external_id: &str,
        plaintext: &[u8],
    ) -> CustodyResult<RecordId> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(CustodyError::Validation(
                "External record id cannot be empty".into(),
            ));
        }

        let _guard = self.lock()?;

        let previous = self.records.get(external_id)?;
        let permission = match &previous {
            Some(_) => Permission::EditPatients,
            None => Permission::AddPatients,
        };
        if let Err(err) = require(session.role, permission) {
            return Err(self.audit_denial(session, external_id, permission, err)?);
        }

        if previous.as_ref().is_some_and(|r| r.tombstoned) {
            return Err(CustodyError::Validation(format!(
                "External id '{}' was deleted and can never be reused",
                external_id
            )));
        }

        let sealed = crypto::seal(self.key, plaintext)?;

        let (record, action) = match previous.clone() {
            Some(mut existing) => {
                existing.reseal(&sealed);
                (existing, AuditAction::Update)
            }
            None => (EncryptedRecord::new(external_id, &sealed), AuditAction::Create),
        };
        let record_id = record.id;

        self.records.upsert(record)?;
        if let Err(err) = self.records.save() {
            self.rollback(external_id, previous)?;
            return Err(err);
        }

        let append = self.ledger.append(
            Some(session.identity_id),
            action,
            ResourceType::Record,
            external_id,
            format!("{} bytes sealed", plaintext.len()),
        );
        if let Err(err) = append {
            // No audit entry, no mutation.
            self.rollback(external_id, previous)?;
            return Err(err);
        }

        Ok(record_id)
    }

    /// Read and decrypt a record's payload
    ///
    /// Requires `view_patients`. Reads are audited too: this layer is
    /// compliance-oriented, not a cache.
    pub fn get(&self, session: &Session, external_id: &str) -> CustodyResult<Vec<u8>> {
        let _guard = self.lock()?;

        if let Err(err) = require(session.role, Permission::ViewPatients) {
            return Err(self.audit_denial(session, external_id, Permission::ViewPatients, err)?);
        }

        let record = self
            .records
            .get(external_id)?
            .filter(|r| !r.tombstoned)
            .ok_or_else(|| CustodyError::record_not_found(external_id))?;

        let plaintext = decrypt_record(self.key, &record)?;

        self.ledger.append(
            Some(session.identity_id),
            AuditAction::Read,
            ResourceType::Record,
            external_id,
            "record payload read",
        )?;

        Ok(plaintext)
    }

    /// Scan live records, returning those whose decrypted payload matches
    /// the predicate
    ///
    /// There is no plaintext index, so every candidate is decrypted to
    /// evaluate the predicate. The scan reflects a point-in-time snapshot;
    /// a record that fails decryption is skipped rather than aborting the
    /// whole scan. Appends one `SEARCH` entry.
    pub fn search<F>(&self, session: &Session, predicate: F) -> CustodyResult<Vec<(String, Vec<u8>)>>
    where
        F: Fn(&str, &[u8]) -> bool,
    {
        let _guard = self.lock()?;

        if let Err(err) = require(session.role, Permission::ViewPatients) {
            return Err(self.audit_denial(session, "*", Permission::ViewPatients, err)?);
        }

        let mut matches = Vec::new();
        let mut skipped = 0usize;

        for record in self.records.get_live()? {
            match decrypt_record(self.key, &record) {
                Ok(plaintext) => {
                    if predicate(&record.external_id, &plaintext) {
                        matches.push((record.external_id.clone(), plaintext));
                    }
                }
                Err(_) => skipped += 1,
            }
        }

        self.ledger.append(
            Some(session.identity_id),
            AuditAction::Search,
            ResourceType::Record,
            "*",
            format!("{} matched, {} undecryptable skipped", matches.len(), skipped),
        )?;

        Ok(matches)
    }

    /// Logically delete a record
    ///
    /// Requires `delete_patients`. The ciphertext is dropped and the
    /// external id tombstoned; the id is burned forever.
    pub fn delete(&self, session: &Session, external_id: &str) -> CustodyResult<()> {
        let _guard = self.lock()?;

        if let Err(err) = require(session.role, Permission::DeletePatients) {
            return Err(self.audit_denial(session, external_id, Permission::DeletePatients, err)?);
        }

        let previous = self
            .records
            .get(external_id)?
            .filter(|r| !r.tombstoned)
            .ok_or_else(|| CustodyError::record_not_found(external_id))?;

        let mut tombstoned = previous.clone();
        tombstoned.tombstone();

        self.records.upsert(tombstoned)?;
        if let Err(err) = self.records.save() {
            self.rollback(external_id, Some(previous))?;
            return Err(err);
        }

        let append = self.ledger.append(
            Some(session.identity_id),
            AuditAction::Delete,
            ResourceType::Record,
            external_id,
            "record tombstoned",
        );
        if let Err(err) = append {
            self.rollback(external_id, Some(previous))?;
            return Err(err);
        }

        Ok(())
    }

    fn lock(&self) -> CustodyResult<std::sync::MutexGuard<'a, ()>> {
        self.op_lock
            .lock()
            .map_err(|e| CustodyError::Storage(format!("Record lock poisoned: {}", e)))
    }

    /// Append the denial entry, then hand the original error back
    ///
    /// If even the denial cannot be audited, the audit failure wins: it is
    /// the more fundamental breakage.
    fn audit_denial(
        &self,
        session: &Session,
        external_id: &str,
        permission: Permission,
        err: CustodyError,
    ) -> CustodyResult<CustodyError> {
        self.ledger.append(
            Some(session.identity_id),
            AuditAction::PermissionDenied,
            ResourceType::Record,
            external_id,
            format!("role '{}' lacks '{}'", session.role, permission),
        )?;
        Ok(err)
    }

    /// Restore the pre-mutation state of one external id
    fn rollback(&self, external_id: &str, previous: Option<EncryptedRecord>) -> CustodyResult<()> {
        match previous {
            Some(record) => self.records.upsert(record)?,
            None => {
                self.records.remove(external_id)?;
            }
        }
        self.records.save()
    }
}

/// Decode and open a record's sealed payload
fn decrypt_record(key: &EncryptionKey, record: &EncryptedRecord) -> CustodyResult<Vec<u8>> {
    let ciphertext = record
        .ciphertext()
        .ok_or_else(|| CustodyError::record_not_found(&record.external_id))?
        .map_err(|_| CustodyError::IntegrityViolation)?;
    crypto::open(key, &ciphertext)
}
