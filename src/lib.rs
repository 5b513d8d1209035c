//! # CosmicPanel
//!
//! **Startup bootstrap for the CosmicPanel daemon.**
//!
//! Runs once at process start, before anything else in the daemon:
//!
//! 1. Load `config.yml` over built-in defaults, expanding `$VAR` / `${VAR}`
//!    from the environment first
//! 2. Resolve (or create) the `cosmicpanel` system account and record its
//!    uid/gid back into the file
//! 3. Create the data directory and hand it to that account
//! 4. Verify the host's license with the license server, falling back to a
//!    DNSONLY or TRIAL license request when verification fails
//!
//! Configuration and account errors abort startup. License problems never do:
//! the daemon keeps whatever license state it had and a restart tries again.
//!
//! ## Quickstart
//!
//! ```no_run
//! use cosmicpanel::{Bootstrap, ConfigStore, LicenseServerConfig};
//!
//! fn main() -> Result<(), cosmicpanel::CosmicError> {
//!     let mut store = ConfigStore::open("config.yml")?;
//!     let bootstrap = Bootstrap::new(LicenseServerConfig::default())?;
//!     let report = bootstrap.run(&mut store, false)?;
//!
//!     println!("running as uid {} ({})", report.user.uid, report.license);
//!     Ok(())
//! }
//! ```
//!
//! ## Writes
//!
//! Every mutation is flushed with [`ConfigStore::write_to_disk`], which takes a
//! non-blocking exclusive lock. A concurrent writer makes the write fail with
//! [`CosmicError::ConfigLocked`] rather than wait.

#![deny(missing_docs)]

// Core modules
pub mod config;
pub mod errors;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// OS account layer
pub mod system;

// Manager (license cycle)
pub mod manager;

// Startup sequence
pub mod bootstrap;

// Re-exports for public API
pub use bootstrap::{Bootstrap, BootstrapReport};
pub use client::config::LicenseServerConfig;
pub use config::model::Configuration;
pub use config::store::ConfigStore;
pub use errors::CosmicError;
pub use manager::{LicenseManager, LicenseStatus};
pub use protocol::models::LicenseType;
pub use system::directory::{OsUserDirectory, UserDirectory};
pub use system::SystemUser;

#[cfg(any(test, feature = "test-seams"))]
pub use system::directory::MockUserDirectory;
