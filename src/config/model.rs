//! Configuration structure persisted as YAML.

use crate::protocol::models::LicenseType;
use crate::system::SystemUser;
use crate::CosmicError;
use serde::{Deserialize, Serialize};

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "/usr/local/cosmicpanel";

/// Default service account name.
pub const DEFAULT_USERNAME: &str = "cosmicpanel";

/// Default panel port.
pub const DEFAULT_PANEL_PORT: u16 = 1334;

/// Root configuration for the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Run in debug mode. The `--debug` flag can force this on at runtime.
    pub debug: bool,

    /// System settings (data directory, service account).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemConfiguration>,

    /// Panel settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel: Option<PanelConfiguration>,

    /// License state from the last verify cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseConfiguration>,

    /// Runtime `--debug` flag; never persisted.
    #[serde(skip)]
    debug_flag: bool,
}

/// System configuration settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfiguration {
    /// Data directory owned by the service account.
    pub data: String,

    /// Name of the service account.
    pub username: String,

    /// Numeric identity of the service account, cached so later steps do not
    /// need another directory lookup. Zero until the account is resolved.
    pub user: UserIds,
}

/// Resolved uid/gid pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserIds {
    /// Numeric user id.
    pub uid: u32,
    /// Numeric group id.
    pub gid: u32,
}

/// Panel configuration settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfiguration {
    /// Port the panel listens on.
    pub port: u16,
}

/// License configuration settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfiguration {
    /// Whether the license server accepted this host.
    #[serde(rename = "validlicense")]
    pub valid_license: bool,

    /// Granted license type.
    #[serde(rename = "licensetype")]
    pub license_type: LicenseType,
}

impl Configuration {
    /// Assign baseline values. Values present in the file should be loaded
    /// afterwards so they override these field by field.
    pub fn set_defaults(&mut self) {
        self.system = Some(SystemConfiguration {
            data: DEFAULT_DATA_DIR.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            user: UserIds::default(),
        });
        self.panel = Some(PanelConfiguration {
            port: DEFAULT_PANEL_PORT,
        });
    }

    /// Record the outcome of a license verify. In-memory only.
    pub fn set_license_settings(&mut self, valid: bool, license_type: LicenseType) {
        self.license = Some(LicenseConfiguration {
            valid_license: valid,
            license_type,
        });
    }

    /// Record the resolved service account. In-memory only.
    pub fn set_system_user(&mut self, user: &SystemUser) {
        let system = self.system.get_or_insert_with(SystemConfiguration::default);
        system.username = user.username.clone();
        system.user = UserIds {
            uid: user.uid,
            gid: user.gid,
        };
    }

    /// Force debug mode on for this run without persisting it.
    pub fn apply_debug_flag(&mut self, flag: bool) {
        self.debug_flag = flag;
    }

    /// Whether the runtime flag forced debug mode on.
    pub fn debug_flag(&self) -> bool {
        self.debug_flag
    }

    /// Whether debug mode is on, from the file or the runtime flag.
    pub fn is_debug(&self) -> bool {
        self.debug || self.debug_flag
    }

    /// Configured service account name.
    pub fn username(&self) -> Option<&str> {
        self.system.as_ref().map(|s| s.username.as_str())
    }

    /// Validate configuration for values later bootstrap steps cannot use.
    pub fn validate(&self) -> Result<(), CosmicError> {
        let system = self.system.as_ref().ok_or_else(|| {
            CosmicError::ConfigError("system section is missing".to_string())
        })?;

        if system.data.trim().is_empty() {
            return Err(CosmicError::ConfigError(
                "system.data cannot be empty".to_string(),
            ));
        }
        validate_username(&system.username)?;

        let panel = self.panel.as_ref().ok_or_else(|| {
            CosmicError::ConfigError("panel section is missing".to_string())
        })?;
        if panel.port == 0 {
            return Err(CosmicError::ConfigError(
                "panel.port cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

// The name is passed to useradd as an argument.
fn validate_username(username: &str) -> Result<(), CosmicError> {
    if username.is_empty() {
        return Err(CosmicError::ConfigError(
            "system.username cannot be empty".to_string(),
        ));
    }
    if username.starts_with('-') {
        return Err(CosmicError::ConfigError(format!(
            "system.username cannot start with '-': {}",
            username
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err(CosmicError::ConfigError(format!(
            "system.username contains invalid characters: {:?}",
            username
        )));
    }
    Ok(())
}
