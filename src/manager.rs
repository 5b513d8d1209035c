//! License Manager - verify the host's license, falling back to a request.
//!
//! The `LicenseManager` runs one license cycle per process:
//! - Outbound IP discovery (skip the cycle when there is no route)
//! - Verify against the license server and persist the result
//! - On any verify failure, request a DNSONLY or TRIAL license instead

use crate::client::config::LicenseServerConfig;
use crate::client::http::LicenseHttpClient;
use crate::client::net::outbound_ip_string;
use crate::config::store::ConfigStore;
use crate::protocol::models::LicenseType;
use crate::CosmicError;
use std::fmt;

/// Outcome of one license cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    /// No outbound IP; nothing was checked and nothing changed.
    Skipped,

    /// The server answered and the result was persisted.
    Verified {
        /// Whether the license is valid.
        valid: bool,
        /// Granted license type.
        license_type: LicenseType,
    },

    /// Verify failed and a new license was requested.
    RequestSent {
        /// License type that was requested.
        requested: LicenseType,
    },

    /// Verify failed and the fallback request could not be delivered either.
    RequestFailed {
        /// License type that was requested.
        requested: LicenseType,
    },
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseStatus::Skipped => f.write_str("skipped (no outbound IP)"),
            LicenseStatus::Verified {
                valid: true,
                license_type,
            } => write!(f, "valid {} license", license_type),
            LicenseStatus::Verified {
                valid: false,
                license_type,
            } => write!(f, "invalid license (type {})", license_type),
            LicenseStatus::RequestSent { requested } => {
                write!(f, "requested {} license", requested)
            }
            LicenseStatus::RequestFailed { requested } => {
                write!(f, "{} license request failed", requested)
            }
        }
    }
}

/// License manager for the daemon.
pub struct LicenseManager {
    config: LicenseServerConfig,
    client: LicenseHttpClient,
}

impl LicenseManager {
    /// Create a new license manager with the given configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - HTTP client creation fails
    pub fn new(config: LicenseServerConfig) -> Result<Self, CosmicError> {
        config.validate()?;
        let client = LicenseHttpClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// Outbound IP of this host, empty when no route is available.
    pub fn outbound_ip(&self) -> String {
        outbound_ip_string(&self.config.probe_addr)
    }

    /// Verify this host's license and persist the answer.
    ///
    /// License exchange failures never surface as errors; they turn into a
    /// fallback request. The only error is failing to write the verified
    /// state to disk.
    ///
    /// # Errors
    /// - `ConfigIO` / `ConfigLocked` / `ConfigSerialize` - Persisting the result failed
    pub fn check_license(
        &self,
        store: &mut ConfigStore,
        prefer_dns_only: bool,
    ) -> Result<LicenseStatus, CosmicError> {
        let ip = self.outbound_ip();
        if ip.is_empty() {
            tracing::debug!("no outbound IP, skipping license check");
            return Ok(LicenseStatus::Skipped);
        }

        match self.client.verify(&ip) {
            Ok(record) => {
                let valid = record.is_valid();
                let license_type = record.license_type();
                store.set_license_settings(valid, license_type);
                store.write_to_disk()?;

                tracing::info!(%ip, valid, %license_type, "license verified");
                Ok(LicenseStatus::Verified {
                    valid,
                    license_type,
                })
            }
            Err(e) if e.is_license_recoverable() => {
                tracing::warn!(%ip, error = %e, "license verify failed, requesting a new license");
                Ok(self.request_with_ip(&ip, prefer_dns_only))
            }
            Err(e) => Err(e),
        }
    }

    /// Request a DNSONLY license when `prefer_dns_only`, otherwise a TRIAL.
    ///
    /// Fire-and-forget: the response is not applied to the configuration and
    /// transport failures are only logged.
    pub fn request_new_license(&self, prefer_dns_only: bool) -> LicenseStatus {
        let ip = self.outbound_ip();
        if ip.is_empty() {
            tracing::debug!("no outbound IP, skipping license request");
            return LicenseStatus::Skipped;
        }
        self.request_with_ip(&ip, prefer_dns_only)
    }

    fn request_with_ip(&self, ip: &str, prefer_dns_only: bool) -> LicenseStatus {
        let requested = LicenseType::fallback_request(prefer_dns_only);
        tracing::info!(%ip, %requested, "requesting license");

        match self.client.request(requested, ip) {
            Ok(status) => {
                tracing::debug!(status, "license request delivered");
                LicenseStatus::RequestSent { requested }
            }
            Err(e) => {
                tracing::warn!(error = %e, "license request failed");
                LicenseStatus::RequestFailed { requested }
            }
        }
    }
}
