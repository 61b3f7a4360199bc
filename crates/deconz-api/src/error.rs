use thiserror::Error;

/// Top-level error type for the `deconz-api` crate.
///
/// Request-scoped failures (transport, auth, gateway-reported errors) are
/// returned to the immediate caller. Session connectivity problems never
/// surface here; they travel as [`SessionEvent`](crate::SessionEvent)s.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The gateway could not be contacted at all.
    #[error("{reason} ({url})")]
    Unreachable { url: String, reason: &'static str },

    /// Any other HTTP transport error. Built through `From`, which strips
    /// the request URL so the access token never reaches the message.
    #[error("HTTP transport error: {0}")]
    Transport(reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Authentication ──────────────────────────────────────────────
    /// No access token has been configured yet.
    #[error("No access token found -- pair with the gateway first")]
    MissingAccessToken,

    /// The gateway rejected the access token.
    #[error("The access token was rejected by the gateway")]
    Unauthorized,

    /// Key acquisition ran out of retries while the link button stayed unpressed.
    #[error("Link button is not pressed")]
    LinkButtonNotPressed,

    // ── Gateway API ─────────────────────────────────────────────────
    /// Error reported by the gateway in its `[{"error": {...}}]` envelope.
    #[error("[{kind}]: {description} : {address}")]
    Api {
        kind: i64,
        description: String,
        address: String,
        status: u16,
    },

    /// Non-success response without a parseable gateway error body.
    #[error("Gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// Event stream transport could not be created.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Caller supplied an unusable argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

impl Error {
    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Returns `true` for the gateway's "forbidden" answer, which during
    /// key acquisition means the link button has not been pressed yet.
    ///
    /// Error type 101 is the gateway's own code for that condition.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403) || matches!(self, Self::Api { kind: 101, .. })
    }
}
