//! License server client configuration.

use std::time::Duration;

/// Production verify endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://licenses.cosmicpanel.net/verify";

/// Production request endpoint.
pub const DEFAULT_REQUEST_URL: &str = "https://licenses.cosmicpanel.net/request";

/// Well-known external address used only to let the OS pick a route.
pub const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:80";

/// Configuration for talking to the license server.
///
/// These settings are not part of the YAML file; the entrypoint builds them
/// from flags.
#[derive(Debug, Clone)]
pub struct LicenseServerConfig {
    /// `GET` endpoint answering `{valid, licenseType}` for an `ip` query.
    pub verify_url: String,

    /// `POST` endpoint accepting `{type, ip}`.
    pub request_url: String,

    /// UDP destination used for outbound IP discovery. No packet is sent.
    pub probe_addr: String,

    /// Per-request timeout. Startup blocks on these calls, so it must be bounded.
    pub timeout: Duration,

    /// User-Agent product identifier.
    pub user_agent_product: String,
}

impl Default for LicenseServerConfig {
    fn default() -> Self {
        Self {
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            request_url: DEFAULT_REQUEST_URL.to_string(),
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            timeout: Duration::from_secs(30),
            user_agent_product: "cosmicpanel".to_string(),
        }
    }
}

impl LicenseServerConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::CosmicError> {
        for (name, url) in [
            ("verify_url", &self.verify_url),
            ("request_url", &self.request_url),
        ] {
            reqwest::Url::parse(url).map_err(|e| {
                crate::CosmicError::ConfigError(format!("{} is not a valid URL ({}): {}", name, url, e))
            })?;
        }
        if self.probe_addr.is_empty() {
            return Err(crate::CosmicError::ConfigError(
                "probe_addr cannot be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(crate::CosmicError::ConfigError(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LicenseServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.verify_url, "https://licenses.cosmicpanel.net/verify");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_bad_url() {
        let config = LicenseServerConfig {
            request_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = LicenseServerConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
