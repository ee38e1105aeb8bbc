//! Storage layer for the custody layer
//!
//! Provides JSON file storage with atomic writes and in-memory repositories
//! for identities and encrypted records. The audit log has its own
//! append-only persistence in `crate::audit` and is deliberately not
//! reachable through these repositories.

pub mod file_io;
pub mod identities;
pub mod records;

pub use file_io::{read_json, write_json_atomic};
pub use identities::IdentityRepository;
pub use records::RecordRepository;
