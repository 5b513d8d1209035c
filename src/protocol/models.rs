//! License server wire structs and the license type enum.

use crate::CosmicError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Feature entitlement granted by the license server.
///
/// Serialized as its integer code. Unknown codes map to [`LicenseType::DnsOnly`],
/// the most restrictive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum LicenseType {
    /// Full panel.
    Full,
    /// Reduced feature set.
    Lite,
    /// DNS management only.
    #[default]
    DnsOnly,
    /// Time-limited trial.
    Trial,
}

impl LicenseType {
    /// Integer code used on the wire and in the configuration file.
    pub fn code(self) -> i64 {
        match self {
            LicenseType::Full => 1,
            LicenseType::Lite => 2,
            LicenseType::DnsOnly => 3,
            LicenseType::Trial => 4,
        }
    }

    /// License type to request when verification did not succeed.
    pub fn fallback_request(prefer_dns_only: bool) -> Self {
        if prefer_dns_only {
            LicenseType::DnsOnly
        } else {
            LicenseType::Trial
        }
    }
}

impl From<i64> for LicenseType {
    fn from(code: i64) -> Self {
        match code {
            1 => LicenseType::Full,
            2 => LicenseType::Lite,
            4 => LicenseType::Trial,
            _ => LicenseType::DnsOnly,
        }
    }
}

impl From<LicenseType> for i64 {
    fn from(license_type: LicenseType) -> Self {
        license_type.code()
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LicenseType::Full => "FULL",
            LicenseType::Lite => "LITE",
            LicenseType::DnsOnly => "DNSONLY",
            LicenseType::Trial => "TRIAL",
        };
        f.write_str(name)
    }
}

/// Response from the verify endpoint.
///
/// A missing or `null` field decodes to its zero value, so the server's
/// answer is still recorded (an absent type becomes DNSONLY).
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseVerifyResponse {
    /// Whether this host holds a valid license.
    #[serde(default)]
    pub valid: Option<bool>,
    /// Raw license type code.
    #[serde(default, rename = "licenseType")]
    pub license_type: Option<i64>,
}

impl LicenseVerifyResponse {
    /// Whether the server reported a valid license.
    pub fn is_valid(&self) -> bool {
        self.valid.unwrap_or_default()
    }

    /// Decoded license type.
    pub fn license_type(&self) -> LicenseType {
        LicenseType::from(self.license_type.unwrap_or_default())
    }
}

/// Body posted to the request endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseRequest {
    /// Requested license type code.
    #[serde(rename = "type")]
    pub license_type: i64,
    /// Outbound IP of this host.
    pub ip: String,
}

impl LicenseRequest {
    /// Build a request for `license_type` on behalf of `ip`.
    pub fn new(license_type: LicenseType, ip: impl Into<String>) -> Self {
        Self {
            license_type: license_type.code(),
            ip: ip.into(),
        }
    }
}

/// Parse raw JSON body into a verify response.
pub fn parse_verify_response(body: &[u8]) -> Result<LicenseVerifyResponse, CosmicError> {
    serde_json::from_slice(body)
        .map_err(|e| CosmicError::ProtocolError(format!("Failed to parse verify response: {}", e)))
}
