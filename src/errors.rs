//! CosmicPanel error types.

use thiserror::Error;

/// Errors that can occur while bootstrapping the daemon.
#[derive(Debug, Error)]
pub enum CosmicError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read or written.
    #[error("Configuration I/O error: {0}")]
    ConfigIO(String),

    /// Configuration file is not valid YAML for the expected structure.
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    /// Configuration could not be serialized for writing.
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(String),

    /// Another writer holds the configuration file.
    #[error("Configuration file {path} is locked by another writer")]
    ConfigLocked {
        /// Path of the locked file.
        path: String,
    },

    /// OS user lookup failed for a reason other than "unknown user".
    #[error("User lookup failed: {0}")]
    UserLookup(String),

    /// Creating the service account failed.
    #[error("User creation failed: {0}")]
    UserCreation(String),

    /// Data directory could not be created or handed to the service account.
    #[error("Data directory error: {0}")]
    DataDirectory(String),

    /// HTTP transport error communicating with the license server.
    #[error("License transport error: {0}")]
    LicenseTransport(String),

    /// License server replied with something we could not decode.
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

impl CosmicError {
    /// Whether the error comes from the license exchange and should trigger
    /// the fallback request instead of aborting startup.
    pub fn is_license_recoverable(&self) -> bool {
        matches!(
            self,
            CosmicError::LicenseTransport(_) | CosmicError::ProtocolError(_)
        )
    }
}
