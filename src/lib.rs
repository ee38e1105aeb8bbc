//! medivault - Compliance-grade data custody layer
//!
//! This library is the security core of a hospital records application. It
//! owns three guarantees that the surrounding UI code must never be able to
//! weaken:
//!
//! - sensitive record payloads are encrypted at rest (authenticated
//!   encryption, fresh nonce per write),
//! - every privileged operation is attributable to an authenticated identity
//!   whose role explicitly grants it (fail-closed),
//! - every access and mutation leaves exactly one entry in an append-only,
//!   sequence-ordered audit ledger.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (identities, encrypted records)
//! - `crypto`: Key management and the cipher envelope
//! - `auth`: Roles, credentials, sessions, and authentication
//! - `audit`: Append-only sequenced audit ledger
//! - `storage`: JSON file storage layer
//! - `services`: Record store and identity administration
//!
//! # Example
//!
//! ```rust,ignore
//! use medivault::config::paths::CustodyPaths;
//! use medivault::services::Custody;
//!
//! let custody = Custody::open(CustodyPaths::new()?)?;
//! let session = custody.authenticator().login("alice", &password)?;
//! let payload = custody.record_store().get(&session, "P-100")?;
//! ```

pub mod audit;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{CustodyError, CustodyResult};
