// Shared HTTP transport configuration for building reqwest::Client instances.
//
// The REST client and the key fetcher both go through `GatewayClient`, so
// timeout and header settings live here once.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

const USER_AGENT: &str = concat!("deconz-rs/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Every request carries `Content-Type: application/json`; the gateway
    /// rejects bodies without it.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::from)
    }
}
