//! Reqwest-based HTTP client for the license server.
//!
//! This module handles the raw HTTP exchanges; deciding what to do with the
//! results is left to [`LicenseManager`](crate::manager::LicenseManager).

use crate::client::config::LicenseServerConfig;
use crate::protocol::models::{parse_verify_response, LicenseRequest, LicenseType, LicenseVerifyResponse};
use crate::CosmicError;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};

/// License server HTTP client.
pub struct LicenseHttpClient {
    client: Client,
    user_agent: String,
    verify_url: String,
    request_url: String,
}

impl LicenseHttpClient {
    /// Create a new client from config.
    pub fn new(config: &LicenseServerConfig) -> Result<Self, CosmicError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CosmicError::LicenseTransport(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: build_user_agent(config),
            verify_url: config.verify_url.clone(),
            request_url: config.request_url.clone(),
        })
    }

    /// Ask the server whether `ip` holds a license.
    ///
    /// Any transport failure, non-success status or undecodable body is an error.
    pub fn verify(&self, ip: &str) -> Result<LicenseVerifyResponse, CosmicError> {
        let response = self
            .client
            .get(&self.verify_url)
            .query(&[("ip", ip)])
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| CosmicError::LicenseTransport(format!("Verify request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .map_err(|e| CosmicError::LicenseTransport(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(CosmicError::LicenseTransport(format!(
                "Verify returned HTTP {}",
                status.as_u16()
            )));
        }

        parse_verify_response(&body)
    }

    /// Post a license request for `ip`. Returns the HTTP status code.
    ///
    /// The response body has no defined contract and is discarded.
    pub fn request(&self, license_type: LicenseType, ip: &str) -> Result<u16, CosmicError> {
        let body = serde_json::to_vec(&LicenseRequest::new(license_type, ip))
            .map_err(|e| CosmicError::ProtocolError(format!("Failed to serialize: {}", e)))?;

        let response = self
            .client
            .post(&self.request_url)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| CosmicError::LicenseTransport(format!("License request failed: {}", e)))?;

        Ok(response.status().as_u16())
    }
}

/// Build a User-Agent string from config.
///
/// Format: `<product>/cosmicpanel-<version>`
pub fn build_user_agent(config: &LicenseServerConfig) -> String {
    format!(
        "{}/cosmicpanel-{}",
        config.user_agent_product,
        env!("CARGO_PKG_VERSION")
    )
}
