//! Audit trail for the custody layer
//!
//! Records every security-relevant event (logins, reads, mutations, denials)
//! in an append-only, sequence-ordered log.
//!
//! # Architecture
//!
//! - `AuditEntry`: one immutable event with its assigned sequence position,
//!   acting identity, action verb, resource coordinates, and timestamp.
//! - `AuditLedger`: assigns gap-free monotonic sequence positions, durably
//!   appends entries as JSON lines, and answers ordered, filtered reads.
//!
//! There is no update or delete surface anywhere in this module; the only
//! write path is `AuditLedger::append`, and only this crate's own operations
//! call it.

mod entry;
mod ledger;

pub use entry::{AuditAction, AuditEntry, ResourceType};
pub use ledger::{AuditFilter, AuditLedger};
