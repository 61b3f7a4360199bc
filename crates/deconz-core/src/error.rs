// ── Core error types ──
//
// User-facing errors from deconz-core. Callers never see raw HTTP plumbing;
// the `From<deconz_api::Error>` impl maps gateway and transport failures
// into domain variants.

use thiserror::Error;

/// Gateway error type reported when a resource id does not exist.
const RESOURCE_NOT_AVAILABLE: i64 = 3;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to gateway at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Event stream unavailable: {reason}")]
    StreamUnavailable { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Link button is not pressed")]
    LinkButtonNotPressed,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Gateway errors ───────────────────────────────────────────────
    #[error("Gateway error {message}")]
    Api {
        message: String,
        /// Gateway error type from the reply envelope.
        code: Option<i64>,
        status: Option<u16>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<deconz_api::Error> for CoreError {
    fn from(err: deconz_api::Error) -> Self {
        use deconz_api::Error as Api;

        match err {
            Api::Unreachable { url, reason } => CoreError::ConnectionFailed {
                url,
                reason: reason.into(),
            },
            Api::Transport(e) => CoreError::Api {
                message: e.to_string(),
                code: None,
                status: e.status().map(|s| s.as_u16()),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            err @ (Api::MissingAccessToken | Api::Unauthorized) => {
                CoreError::AuthenticationFailed {
                    message: err.to_string(),
                }
            }
            Api::LinkButtonNotPressed => CoreError::LinkButtonNotPressed,
            Api::Api {
                kind: RESOURCE_NOT_AVAILABLE,
                address,
                ..
            } => CoreError::NotFound {
                identifier: address,
            },
            Api::Api {
                kind,
                description,
                address,
                status,
            } => CoreError::Api {
                message: format!("[{kind}]: {description} : {address}"),
                code: Some(kind),
                status: Some(status),
            },
            Api::Http { status, body } => CoreError::Api {
                message: format!("HTTP {status}: {body}"),
                code: None,
                status: Some(status),
            },
            Api::WebSocketConnect(reason) => CoreError::StreamUnavailable { reason },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            Api::InvalidArgument(message) => CoreError::ValidationFailed { message },
            Api::Cancelled => CoreError::Cancelled,
        }
    }
}
