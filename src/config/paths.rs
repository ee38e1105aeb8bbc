//! Path management for the custody layer
//!
//! Provides XDG-compliant path resolution for configuration, data, the key
//! file, and the audit log.
//!
//! ## Path Resolution Order
//!
//! 1. `MEDIVAULT_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/medivault` or `~/.config/medivault`
//! 3. Windows: `%APPDATA%\medivault`

use std::path::PathBuf;

use crate::error::CustodyError;

/// Manages all paths used by the custody layer
#[derive(Debug, Clone)]
pub struct CustodyPaths {
    /// Base directory for all custody data
    base_dir: PathBuf,
}

impl CustodyPaths {
    /// Create a new CustodyPaths instance
    ///
    /// Path resolution:
    /// 1. `MEDIVAULT_DATA_DIR` env var (explicit override)
    /// 2. Unix: `$XDG_CONFIG_HOME/medivault` or `~/.config/medivault`
    /// 3. Windows: `%APPDATA%\medivault`
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, CustodyError> {
        let base_dir = if let Ok(custom) = std::env::var("MEDIVAULT_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create CustodyPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/medivault/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (~/.config/medivault/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the encryption key file
    ///
    /// Kept in the data directory alongside the stores it protects; the key
    /// file itself is opaque binary, not JSON.
    pub fn key_file(&self) -> PathBuf {
        self.data_dir().join("custody.key")
    }

    /// Get the path to identities.json
    pub fn identities_file(&self) -> PathBuf {
        self.data_dir().join("identities.json")
    }

    /// Get the path to records.json
    pub fn records_file(&self) -> PathBuf {
        self.data_dir().join("records.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Ensure all required directories exist
    ///
    /// Creates:
    /// - Base directory (~/.config/medivault/)
    /// - Data directory (~/.config/medivault/data/)
    pub fn ensure_directories(&self) -> Result<(), CustodyError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| CustodyError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| CustodyError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }

    /// Check if the custody layer has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, CustodyError> {
    // Unix (Linux/macOS): Use XDG_CONFIG_HOME if set, otherwise ~/.config
    let config_base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
    Ok(config_base.join("medivault"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, CustodyError> {
    // Windows: Use APPDATA
    let appdata = std::env::var("APPDATA")
        .map_err(|_| CustodyError::Io("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("medivault"))
}
