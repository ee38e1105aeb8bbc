//! Authentication and authorization
//!
//! - `roles`: the fixed role enumeration and its static permission grants
//!   (fail-closed; changing a grant is a code change, not configuration)
//! - `credentials`: salted slow-hash password verifiers and identity lifecycle
//! - `session`: the in-memory session value threaded through calls
//! - `authenticator`: login/logout with audited outcomes

pub mod authenticator;
pub mod credentials;
pub mod roles;
pub mod session;

pub use authenticator::Authenticator;
pub use credentials::CredentialStore;
pub use roles::{check, permissions_for, require, Permission, Role};
pub use session::Session;
