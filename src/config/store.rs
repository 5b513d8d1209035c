//! File-backed configuration store.
//!
//! Loads the YAML file over whatever is already in memory (normally the
//! defaults) and writes the whole configuration back under an exclusive,
//! non-blocking `flock(2)`.

use crate::config::expand::expand_env;
use crate::config::model::Configuration;
use crate::protocol::models::LicenseType;
use crate::CosmicError;
use serde_yaml::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Configuration bound to the file it was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: Configuration,
}

impl ConfigStore {
    /// Create a store for `path` with an empty configuration. Nothing is read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Configuration::default(),
        }
    }

    /// Defaults first, then the file on top of them.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CosmicError> {
        let mut store = Self::new(path);
        store.set_defaults();
        store.load()?;
        Ok(store)
    }

    /// Read the file with no defaults applied; absent fields stay zero.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, CosmicError> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    /// Read, expand and merge the file into the in-memory configuration.
    ///
    /// Only fields present in the file are overwritten.
    pub fn load(&mut self) -> Result<(), CosmicError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            CosmicError::ConfigIO(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        self.config = merge_text(&self.config, &expand_env(&raw))?;
        tracing::debug!(path = %self.path.display(), "configuration loaded");
        Ok(())
    }

    /// Apply default values in memory.
    pub fn set_defaults(&mut self) {
        self.config.set_defaults();
    }

    /// Record license state in memory; call [`write_to_disk`](Self::write_to_disk) to persist.
    pub fn set_license_settings(&mut self, valid: bool, license_type: LicenseType) {
        self.config.set_license_settings(valid, license_type);
    }

    /// Serialize the whole configuration back to its file.
    ///
    /// Fails with [`CosmicError::ConfigLocked`] instead of waiting when another
    /// writer holds the file. The file is only truncated once the lock is held.
    pub fn write_to_disk(&self) -> Result<(), CosmicError> {
        let yaml = serde_yaml::to_string(&self.config)
            .map_err(|e| CosmicError::ConfigSerialize(e.to_string()))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| {
                CosmicError::ConfigIO(format!("Failed to open {}: {}", self.path.display(), e))
            })?;

        try_lock_exclusive(&file).map_err(|e| {
            if e.kind() == io::ErrorKind::WouldBlock {
                CosmicError::ConfigLocked {
                    path: self.path.display().to_string(),
                }
            } else {
                CosmicError::ConfigIO(format!("Failed to lock {}: {}", self.path.display(), e))
            }
        })?;

        let write = |file: &mut File| -> io::Result<()> {
            file.set_len(0)?;
            file.write_all(yaml.as_bytes())?;
            file.sync_all()
        };
        write(&mut file).map_err(|e| {
            CosmicError::ConfigIO(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), "configuration written");
        Ok(())
    }

    /// The in-memory configuration.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Mutable access to the in-memory configuration.
    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Take an exclusive `flock` without blocking. Released when `file` is closed.
pub fn try_lock_exclusive(file: &File) -> io::Result<()> {
    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

fn merge_text(base: &Configuration, text: &str) -> Result<Configuration, CosmicError> {
    let overlay: Value =
        serde_yaml::from_str(text).map_err(|e| CosmicError::ConfigParse(e.to_string()))?;

    let mut merged =
        serde_yaml::to_value(base).map_err(|e| CosmicError::ConfigSerialize(e.to_string()))?;
    merge_value(&mut merged, overlay);

    let mut config: Configuration =
        serde_yaml::from_value(merged).map_err(|e| CosmicError::ConfigParse(e.to_string()))?;
    config.apply_debug_flag(base.debug_flag());
    Ok(config)
}

// Mappings merge key by key, nulls keep the base, anything else replaces.
fn merge_value(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
