//! Configuration module for the custody layer
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Password policy and key-derivation work factors

pub mod paths;
pub mod settings;

pub use paths::CustodyPaths;
pub use settings::Settings;
