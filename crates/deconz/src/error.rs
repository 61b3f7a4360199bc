//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use deconz_config::ConfigError;
use deconz_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach gateway at {url}: {reason}")]
    #[diagnostic(
        code(deconz::connection_failed),
        help(
            "Check that the gateway is running and the host/port are correct.\n\
             Try: deconz --host <ip> --port <port> lights list"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Event stream unavailable: {reason}")]
    #[diagnostic(
        code(deconz::stream_unavailable),
        help("Check the websocket port (--ws-port, default 8088) and protocol in your profile.")
    )]
    StreamUnavailable { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(deconz::auth_failed),
        help("Obtain a new access token with: deconz pair --save")
    )]
    AuthFailed { message: String },

    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(deconz::no_credentials),
        help(
            "Unlock the gateway and run: deconz pair --save\n\
             Or set DECONZ_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    #[error("Link button is not pressed")]
    #[diagnostic(
        code(deconz::link_button),
        help(
            "Unlock the gateway (Phoscon app: Gateway > Advanced > Authenticate app) \
             and run the command again, or raise --retries."
        )
    )]
    LinkButtonNotPressed,

    // ── Resources ────────────────────────────────────────────────────
    #[error("'{identifier}' not found")]
    #[diagnostic(
        code(deconz::not_found),
        help("Run: deconz lights list / deconz sensors list to see available ids")
    )]
    NotFound { identifier: String },

    // ── Gateway ──────────────────────────────────────────────────────
    #[error("Gateway error: {message}")]
    #[diagnostic(code(deconz::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(deconz::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No gateway configured")]
    #[diagnostic(
        code(deconz::no_config),
        help(
            "Create a profile with: deconz --host <ip> config init\n\
             Or pass --host / set DECONZ_HOST.\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(deconz::config))]
    Config(Box<ConfigError>),

    #[error("Interrupted")]
    #[diagnostic(code(deconz::cancelled))]
    Cancelled,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(deconz::json))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(deconz::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::StreamUnavailable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::LinkButtonNotPressed => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::StreamUnavailable { reason } => CliError::StreamUnavailable { reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::LinkButtonNotPressed => CliError::LinkButtonNotPressed,
            CoreError::NotFound { identifier } => CliError::NotFound { identifier },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "argument".into(),
                reason: message,
            },
            CoreError::Api { message, .. } => CliError::Api { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Cancelled => CliError::Cancelled,
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
