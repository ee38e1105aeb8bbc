//! Settings for the custody layer
//!
//! Manages the password policy and the Argon2id work factors used for
//! password verifiers. These are deployment-time knobs, persisted in
//! `config.json`; role permissions are deliberately NOT configurable here
//! (see `auth::roles`).

use serde::{Deserialize, Serialize};

use super::paths::CustodyPaths;
use crate::error::CustodyResult;
use crate::storage::file_io::{read_json, write_json_atomic};

/// Minimum-entropy policy applied to new passwords
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Minimum password length in characters
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    /// Validate a candidate password against the policy
    pub fn check(&self, password: &str) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!(
                "Password must be at least {} characters",
                self.min_length
            ));
        }
        Ok(())
    }
}

/// Argon2id work factors for password verifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism degree (default: 4)
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl HashingParams {
    /// Reduced work factors for unit tests, where the default 64 MiB cost
    /// makes every verifier derivation take noticeable wall time.
    #[cfg(test)]
    pub fn fast_insecure() -> Self {
        Self {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Settings for the custody layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Minimum-entropy policy for new passwords
    #[serde(default)]
    pub password_policy: PasswordPolicy,

    /// Argon2id work factors
    #[serde(default)]
    pub hashing: HashingParams,
}

impl Settings {
    /// Load settings from disk, creating the file with defaults if absent
    pub fn load_or_create(paths: &CustodyPaths) -> CustodyResult<Self> {
        let path = paths.settings_file();
        if path.exists() {
            read_json(&path)
        } else {
            paths.ensure_directories()?;
            let settings = Self::default();
            write_json_atomic(&path, &settings)?;
            Ok(settings)
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &CustodyPaths) -> CustodyResult<()> {
        write_json_atomic(paths.settings_file(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.password_policy.min_length, 8);
        assert_eq!(settings.hashing.memory_cost, 65536);
        assert_eq!(settings.hashing.time_cost, 3);
        assert_eq!(settings.hashing.parallelism, 4);
    }

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy { min_length: 8 };
        assert!(policy.check("short").is_err());
        assert!(policy.check("long enough").is_ok());
    }

    #[test]
    fn test_load_or_create_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CustodyPaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = Settings::load_or_create(&paths).unwrap();
        assert!(paths.settings_file().exists());

        let reloaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(
            settings.password_policy.min_length,
            reloaded.password_policy.min_length
        );
    }
}
