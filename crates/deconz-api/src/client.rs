// Gateway REST client
//
// Wraps `reqwest::Client` with deCONZ URL construction (the access token is
// a path segment), optional body/query handling, and error classification.
// Endpoint groups (lights, sensors, key acquisition) are implemented as
// inherent methods in separate files.

use std::io;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::GatewayReply;
use crate::transport::TransportConfig;

/// HTTP client for the gateway's REST API.
///
/// Authenticated calls go to `http://{host}:{port}/api/{token}{path}`; the
/// key acquisition call goes to `http://{host}:{port}/api`.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_access_token", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client for the gateway rooted at `base_url`
    /// (e.g. `http://192.168.1.20:80`).
    pub fn new(
        base_url: Url,
        access_token: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, access_token))
    }

    /// Create a client from a host and REST port.
    pub fn from_host(
        host: &str,
        port: u16,
        access_token: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        if host.is_empty() {
            return Err(Error::InvalidArgument("gateway host must not be empty".into()));
        }
        let base_url = Url::parse(&format!("http://{host}:{port}"))?;
        Self::new(base_url, access_token, transport)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        access_token: Option<SecretString>,
    ) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    /// Return a copy of this client that authenticates with `token`.
    pub fn with_access_token(&self, token: SecretString) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            access_token: Some(token),
        }
    }

    /// The gateway base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn root(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/api/{token}{path}`. Fails before any I/O if no token is set.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let token = self
            .access_token
            .as_ref()
            .ok_or(Error::MissingAccessToken)?;
        let full = format!("{}/api/{}{}", self.root(), token.expose_secret(), path);
        Ok(Url::parse(&full)?)
    }

    /// `{base}/api`, used only for key acquisition.
    pub(crate) fn unauthenticated_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("{}/api", self.root()))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated request.
    ///
    /// `body` is omitted when `None`, `null`, or an empty object. `query` is
    /// omitted when empty.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        self.send(method, url, body, query).await
    }

    /// Send a request to the unauthenticated `/api` root.
    pub async fn request_unauthenticated<T: DeserializeOwned>(
        &self,
        method: Method,
        body: Option<&Value>,
    ) -> Result<T, Error> {
        let url = self.unauthenticated_url()?;
        self.send(method, url, body, &[]).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        debug!(%method, path = %redacted_path(&url), "gateway request");

        let target = endpoint_label(&url);
        let mut builder = self.http.request(method, url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body.filter(|b| !is_empty_body(b)) {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| classify_send_error(target, e))?;

        parse_response(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }

    let body = resp.text().await?;

    if !status.is_success() {
        return Err(gateway_error(status.as_u16(), body));
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Turn a non-success body into the most specific error available.
///
/// The gateway reports failures as `[{"error": {"type", "address", "description"}}]`.
pub(crate) fn gateway_error(status: u16, body: String) -> Error {
    let first = serde_json::from_str::<Vec<GatewayReply>>(&body)
        .ok()
        .and_then(|replies| replies.into_iter().find_map(|r| r.error));

    match first {
        Some(err) => Error::Api {
            kind: err.kind,
            description: err.description,
            address: err.address,
            status,
        },
        None => Error::Http { status, body },
    }
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

// ── Error classification ─────────────────────────────────────────────

/// `host:port` of the request target, never including the token.
fn endpoint_label(url: &Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or("<unknown>"),
        url.port_or_known_default().unwrap_or_default()
    )
}

/// Request path with the access token segment masked.
fn redacted_path(url: &Url) -> String {
    let mut segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    if segments.len() > 1 && segments.first() == Some(&"api") {
        segments[1] = "***";
    }
    format!("/{}", segments.join("/"))
}

fn classify_send_error(target: String, err: reqwest::Error) -> Error {
    if err.is_connect() {
        return Error::Unreachable {
            url: target,
            reason: connect_failure_reason(&err),
        };
    }
    if err.is_timeout() {
        return Error::Unreachable {
            url: target,
            reason: "Request timed out",
        };
    }
    Error::from(err)
}

fn connect_failure_reason(err: &(dyn std::error::Error + 'static)) -> &'static str {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => {
                    return "Host is not accessible at specified port";
                }
                io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                    return "Host could not be reached";
                }
                _ => {}
            }
        }
        if e.to_string().contains("dns error") {
            return "Host could not be found";
        }
        current = e.source();
    }
    "Host could not be reached"
}
