// ── Runtime gateway configuration ──
//
// Describes how to reach one gateway. Carries the access token but never
// touches disk; the CLI builds a `GatewayConfig` from a profile and hands
// it in.

use std::time::Duration;

use deconz_api::{DEFAULT_RETRY_DELAY, GatewayClient, TransportConfig};
use secrecy::SecretString;
use strum::{Display, EnumString};

use crate::error::CoreError;

pub const DEFAULT_REST_PORT: u16 = 80;
pub const DEFAULT_WS_PORT: u16 = 8088;

/// Scheme of the event stream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StreamProtocol {
    #[default]
    Ws,
    Wss,
}

/// Connection settings for a single gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Hostname or IP address, without scheme.
    pub host: String,
    /// REST API port.
    pub port: u16,
    /// Event stream port.
    pub ws_port: u16,
    pub protocol: StreamProtocol,
    pub access_token: Option<SecretString>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Wait between key requests while the link button is not pressed.
    pub pair_retry_delay: Duration,
}

impl GatewayConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_REST_PORT,
            ws_port: DEFAULT_WS_PORT,
            protocol: StreamProtocol::default(),
            access_token: None,
            timeout: Duration::from_secs(30),
            pair_retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_access_token(mut self, token: SecretString) -> Self {
        self.access_token = Some(token);
        self
    }

    /// `{protocol}://{host}:{ws_port}`
    pub fn stream_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.ws_port)
    }

    /// Build the REST client for this gateway.
    pub fn rest_client(&self) -> Result<GatewayClient, CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "gateway host is empty".into(),
            });
        }
        let transport = TransportConfig::with_timeout(self.timeout);
        Ok(GatewayClient::from_host(
            &self.host,
            self.port,
            self.access_token.clone(),
            &transport,
        )?)
    }
}
