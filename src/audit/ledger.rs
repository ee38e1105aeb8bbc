//! Append-only sequenced audit ledger
//!
//! Entries are written as single JSON lines (JSONL) and flushed and synced
//! before `append` returns. The ledger assigns sequence positions itself:
//! appends are serialized behind a mutex, so positions are gap-free and
//! strictly monotonic even under concurrent callers.
//!
//! The ledger remembers the file length it left behind after each append.
//! If the file has been deleted, truncated, or otherwise resized out from
//! under it, the next `append` fails with `AuditWriteFailed` instead of
//! silently writing past a gap.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{CustodyError, CustodyResult};
use crate::models::IdentityId;

use super::entry::{AuditAction, AuditEntry, ResourceType};

/// Filter for audit queries
///
/// All fields are optional; an empty filter matches every entry.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Only entries by this acting identity
    pub actor: Option<IdentityId>,
    /// Only entries touching this resource type
    pub resource_type: Option<ResourceType>,
    /// Only entries at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only entries at or before this instant
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(actor) = self.actor {
            if entry.actor != Some(actor) {
                return false;
            }
        }
        if let Some(resource_type) = self.resource_type {
            if entry.resource_type != resource_type {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// State the append path needs to keep consistent between calls
struct LedgerState {
    /// Sequence position the next entry will receive
    next_sequence: u64,
    /// File length observed after our last append (0 before the first)
    expected_len: u64,
}

/// Append-only audit ledger backed by a JSONL file
pub struct AuditLedger {
    log_path: PathBuf,
    state: Mutex<LedgerState>,
}

impl AuditLedger {
    /// Open (or start) the ledger at the given path
    ///
    /// Scans any existing log to recover the next sequence position and the
    /// current file length. A pre-existing log with unparseable lines is
    /// rejected rather than silently resequenced.
    pub fn open(log_path: PathBuf) -> CustodyResult<Self> {
        let (next_sequence, expected_len) = if log_path.exists() {
            let entries = read_entries(&log_path)?;
            let next = entries.last().map(|e| e.sequence + 1).unwrap_or(0);
            let len = std::fs::metadata(&log_path)
                .map_err(|e| CustodyError::Io(format!("Failed to stat audit log: {}", e)))?
                .len();
            (next, len)
        } else {
            (0, 0)
        };

        Ok(Self {
            log_path,
            state: Mutex::new(LedgerState {
                next_sequence,
                expected_len,
            }),
        })
    }

    /// Append an entry, durably, returning its assigned sequence position
    ///
    /// All-or-nothing: either the entry is flushed and synced to disk and
    /// its sequence returned, or the call fails with `AuditWriteFailed` and
    /// nothing is recorded. Concurrent appends are serialized.
    ///
    /// Crate-private on purpose: collaborators get the read-only query
    /// surface, and only this layer's own operations insert entries.
    pub(crate) fn append(
        &self,
        actor: Option<IdentityId>,
        action: AuditAction,
        resource_type: ResourceType,
        resource_id: impl Into<String>,
        detail: impl Into<String>,
    ) -> CustodyResult<u64> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| CustodyError::AuditWriteFailed(format!("Ledger lock poisoned: {}", e)))?;

        // The log must still be exactly as we left it. A missing or resized
        // file means someone outside this ledger touched the trail.
        let actual_len = match std::fs::metadata(&self.log_path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(CustodyError::AuditWriteFailed(format!(
                    "Failed to stat audit log: {}",
                    e
                )))
            }
        };
        if actual_len != state.expected_len {
            return Err(CustodyError::AuditWriteFailed(format!(
                "Audit log altered outside the ledger: expected {} bytes, found {}",
                state.expected_len, actual_len
            )));
        }

        let entry = AuditEntry {
            sequence: state.next_sequence,
            actor,
            action,
            resource_type,
            resource_id: resource_id.into(),
            detail: detail.into(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&entry)
            .map_err(|e| CustodyError::AuditWriteFailed(format!("Failed to serialize: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| CustodyError::AuditWriteFailed(format!("Failed to open log: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| CustodyError::AuditWriteFailed(format!("Failed to write entry: {}", e)))?;

        file.flush()
            .map_err(|e| CustodyError::AuditWriteFailed(format!("Failed to flush log: {}", e)))?;

        file.sync_all()
            .map_err(|e| CustodyError::AuditWriteFailed(format!("Failed to sync log: {}", e)))?;

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.expected_len += json.len() as u64 + 1; // trailing newline

        Ok(sequence)
    }

    /// Read entries matching the filter, ascending by sequence
    ///
    /// The sequence position is the ordering authority, not the timestamp.
    /// `limit` caps the number of returned entries (most recent last).
    pub fn read(&self, filter: &AuditFilter, limit: usize) -> CustodyResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<_> = read_entries(&self.log_path)?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();

        entries.sort_by_key(|e| e.sequence);

        if entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }
        Ok(entries)
    }

    /// Number of entries currently in the ledger
    pub fn entry_count(&self) -> CustodyResult<usize> {
        if !self.log_path.exists() {
            return Ok(0);
        }
        Ok(read_entries(&self.log_path)?.len())
    }

    /// Sequence position of the most recent entry, if any
    pub fn last_sequence(&self) -> CustodyResult<Option<u64>> {
        Ok(read_entries(&self.log_path)?.last().map(|e| e.sequence))
    }

    /// Get the path to the audit log file
    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

/// Parse every JSONL entry in the log file
fn read_entries(path: &PathBuf) -> CustodyResult<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .map_err(|e| CustodyError::Io(format!("Failed to open audit log: {}", e)))?;

    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            CustodyError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
            CustodyError::Json(format!(
                "Failed to parse audit entry at line {}: {}",
                line_num + 1,
                e
            ))
        })?;

        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_ledger() -> (AuditLedger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let ledger = AuditLedger::open(temp_dir.path().join("audit.log")).unwrap();
        (ledger, temp_dir)
    }

    #[test]
    fn test_append_assigns_monotonic_sequences() {
        let (ledger, _temp) = create_test_ledger();

        for expected in 0..5u64 {
            let seq = ledger
                .append(None, AuditAction::Create, ResourceType::Record, "P-100", "x")
                .unwrap();
            assert_eq!(seq, expected);
        }

        let entries = ledger.read(&AuditFilter::default(), 100).unwrap();
        assert_eq!(entries.len(), 5);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, i as u64);
        }
    }

    #[test]
    fn test_sequence_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("audit.log");

        let ledger = AuditLedger::open(path.clone()).unwrap();
        ledger
            .append(None, AuditAction::Create, ResourceType::Record, "P-1", "a")
            .unwrap();
        ledger
            .append(None, AuditAction::Read, ResourceType::Record, "P-1", "b")
            .unwrap();

        let reopened = AuditLedger::open(path).unwrap();
        let seq = reopened
            .append(None, AuditAction::Update, ResourceType::Record, "P-1", "c")
            .unwrap();
        assert_eq!(seq, 2);
    }

    #[test]
    fn test_truncated_log_fails_append() {
        let (ledger, _temp) = create_test_ledger();

        ledger
            .append(None, AuditAction::Create, ResourceType::Record, "P-1", "a")
            .unwrap();

        // Truncate the log behind the ledger's back
        std::fs::write(ledger.path(), b"").unwrap();

        let err = ledger
            .append(None, AuditAction::Read, ResourceType::Record, "P-1", "b")
            .unwrap_err();
        assert!(matches!(err, CustodyError::AuditWriteFailed(_)));
    }

    #[test]
    fn test_deleted_log_fails_append() {
        let (ledger, _temp) = create_test_ledger();

        ledger
            .append(None, AuditAction::Create, ResourceType::Record, "P-1", "a")
            .unwrap();

        std::fs::remove_file(ledger.path()).unwrap();

        assert!(matches!(
            ledger.append(None, AuditAction::Read, ResourceType::Record, "P-1", "b"),
            Err(CustodyError::AuditWriteFailed(_))
        ));
    }

    #[test]
    fn test_filter_by_actor() {
        let (ledger, _temp) = create_test_ledger();
        let alice = IdentityId::new();
        let bob = IdentityId::new();

        ledger
            .append(Some(alice), AuditAction::Read, ResourceType::Record, "P-1", "")
            .unwrap();
        ledger
            .append(Some(bob), AuditAction::Read, ResourceType::Record, "P-2", "")
            .unwrap();
        ledger
            .append(Some(alice), AuditAction::Update, ResourceType::Record, "P-1", "")
            .unwrap();

        let filter = AuditFilter {
            actor: Some(alice),
            ..Default::default()
        };
        let entries = ledger.read(&filter, 100).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.actor == Some(alice)));
    }

    #[test]
    fn test_filter_by_resource_type() {
        let (ledger, _temp) = create_test_ledger();

        ledger
            .append(None, AuditAction::Read, ResourceType::Record, "P-1", "")
            .unwrap();
        ledger
            .append(None, AuditAction::LoginSuccess, ResourceType::Identity, "alice", "")
            .unwrap();

        let filter = AuditFilter {
            resource_type: Some(ResourceType::Identity),
            ..Default::default()
        };
        let entries = ledger.read(&filter, 100).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::LoginSuccess);
    }

    #[test]
    fn test_filter_by_time_range() {
        let (ledger, _temp) = create_test_ledger();

        ledger
            .append(None, AuditAction::Create, ResourceType::Record, "P-1", "")
            .unwrap();

        let after_everything = Utc::now() + chrono::Duration::hours(1);
        let filter = AuditFilter {
            since: Some(after_everything),
            ..Default::default()
        };
        assert!(ledger.read(&filter, 100).unwrap().is_empty());

        let filter = AuditFilter {
            until: Some(after_everything),
            ..Default::default()
        };
        assert_eq!(ledger.read(&filter, 100).unwrap().len(), 1);
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let (ledger, _temp) = create_test_ledger();

        for i in 0..10 {
            ledger
                .append(None, AuditAction::Read, ResourceType::Record, format!("P-{}", i), "")
                .unwrap();
        }

        let entries = ledger.read(&AuditFilter::default(), 3).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].resource_id, "P-7");
        assert_eq!(entries[2].resource_id, "P-9");
    }

    #[test]
    fn test_concurrent_appends_are_gap_free() {
        use std::sync::Arc;

        let temp_dir = TempDir::new().unwrap();
        let ledger = Arc::new(AuditLedger::open(temp_dir.path().join("audit.log")).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        ledger
                            .append(
                                None,
                                AuditAction::Read,
                                ResourceType::Record,
                                format!("P-{}-{}", t, i),
                                "",
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let entries = ledger.read(&AuditFilter::default(), 1000).unwrap();
        assert_eq!(entries.len(), 100);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, i as u64);
        }
    }

    #[test]
    fn test_entry_count_and_last_sequence() {
        let (ledger, _temp) = create_test_ledger();

        assert_eq!(ledger.entry_count().unwrap(), 0);
        assert_eq!(ledger.last_sequence().unwrap(), None);

        ledger
            .append(None, AuditAction::Create, ResourceType::Record, "P-1", "")
            .unwrap();
        assert_eq!(ledger.entry_count().unwrap(), 1);
        assert_eq!(ledger.last_sequence().unwrap(), Some(0));
    }

    #[test]
    fn test_last_sequence_surfaces_unparseable_log() {
        let (ledger, _temp) = create_test_ledger();

        ledger
            .append(None, AuditAction::Create, ResourceType::Record, "P-1", "")
            .unwrap();
        std::fs::write(ledger.path(), b"not an entry\n").unwrap();

        assert!(ledger.last_sequence().is_err());
    }
}
