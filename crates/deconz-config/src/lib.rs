//! Shared configuration for deconz tools.
//!
//! TOML profiles, access-token resolution (env + keyring + plaintext),
//! and translation to `deconz_core::GatewayConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use deconz_core::{DEFAULT_REST_PORT, DEFAULT_WS_PORT, GatewayConfig, StreamProtocol};

/// Keyring service name for stored access tokens.
pub const KEYRING_SERVICE: &str = "deconz";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "DECONZ_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("no access token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile names, sorted, for error messages and listings.
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up `name`, failing with the list of known profiles.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: match self.profile_names() {
                    names if names.is_empty() => "none".into(),
                    names => names.join(", "),
                },
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// A named gateway profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Gateway hostname or IP, without scheme.
    pub host: String,

    /// REST API port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Access token (plaintext -- prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Environment variable name containing the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,

    /// Event stream port.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// Event stream scheme: "ws" or "wss".
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Override the default request timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            access_token: None,
            access_token_env: None,
            ws_port: default_ws_port(),
            protocol: default_protocol(),
            timeout: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_REST_PORT
}
fn default_ws_port() -> u16 {
    DEFAULT_WS_PORT
}
fn default_protocol() -> String {
    "ws".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$DECONZ_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "deconz", "deconz").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("deconz");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + `DECONZ_*` environment overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DECONZ_").only(&["default_profile"]));

    Ok(figment.extract()?)
}

/// Load config, returning a default if it is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

/// Serialize `cfg` to TOML and write it to `path`.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "config saved");
    Ok(())
}

// ── Access token resolution ─────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/access-token"))
}

/// Resolve a profile's access token: env var named by `access_token_env`,
/// then the system keyring, then the plaintext `access_token`.
pub fn resolve_access_token(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    resolve_access_token_with(profile, profile_name, |name| std::env::var(name).ok())
}

fn resolve_access_token_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's access_token_env → env var lookup
    if let Some(value) = profile.access_token_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(value));
    }

    // 2. System keyring
    if let Ok(secret) = keyring_entry(profile_name).and_then(|entry| entry.get_password()) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.access_token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an access token in the system keyring under `profile_name`.
pub fn store_access_token(profile_name: &str, token: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token.expose_secret())?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `GatewayConfig` from a profile. A missing token is not an error
/// here; pairing runs without one.
pub fn profile_to_gateway_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<GatewayConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no gateway host"),
        });
    }

    let protocol: StreamProtocol =
        profile
            .protocol
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "protocol".into(),
                reason: format!("expected 'ws' or 'wss', got '{}'", profile.protocol),
            })?;

    let mut config = GatewayConfig::new(profile.host.trim());
    config.port = profile.port;
    config.ws_port = profile.ws_port;
    config.protocol = protocol;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.access_token = resolve_access_token(profile, profile_name).ok();
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn profile_defaults_fill_in() {
        let cfg: Config = toml::from_str(
            r#"
            default_profile = "home"

            [profiles.home]
            host = "192.168.1.20"
            "#,
        )
        .unwrap();

        let home = cfg.profile("home").unwrap();
        assert_eq!(home.port, 80);
        assert_eq!(home.ws_port, 8088);
        assert_eq!(home.protocol, "ws");
        assert!(home.access_token.is_none());
    }

    #[test]
    fn unknown_profile_lists_available() {
        let mut cfg = Config::default();
        cfg.profiles.insert("b".into(), Profile::new("h"));
        cfg.profiles.insert("a".into(), Profile::new("h"));

        let err = cfg.profile("c").unwrap_err();
        assert_eq!(err.to_string(), "profile 'c' not found (available: a, b)");
    }

    #[test]
    fn env_var_wins_over_plaintext() {
        let mut profile = Profile::new("gw");
        profile.access_token = Some("from-file".into());
        profile.access_token_env = Some("GW_TOKEN".into());

        let token = resolve_access_token_with(&profile, "env-test-profile", |name| {
            (name == "GW_TOKEN").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(token.expose_secret(), "from-env");
    }

    #[test]
    fn plaintext_is_the_last_resort() {
        let mut profile = Profile::new("gw");
        profile.access_token = Some("from-file".into());
        profile.access_token_env = Some("UNSET_TOKEN_VAR".into());

        let token =
            resolve_access_token_with(&profile, "deconz-config-test-plaintext", no_env).unwrap();
        assert_eq!(token.expose_secret(), "from-file");
    }

    #[test]
    fn no_token_anywhere_is_an_error() {
        let profile = Profile::new("gw");
        let err = resolve_access_token_with(&profile, "deconz-config-test-missing", no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn translation_to_gateway_config() {
        let mut profile = Profile::new(" gw.local ");
        profile.port = 8080;
        profile.protocol = "wss".into();
        profile.timeout = Some(5);
        profile.access_token = Some("tok".into());

        let config = profile_to_gateway_config(&profile, "x", &Defaults::default()).unwrap();
        assert_eq!(config.host, "gw.local");
        assert_eq!(config.port, 8080);
        assert_eq!(config.stream_url(), "wss://gw.local:8088");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.access_token.is_some());
    }

    #[test]
    fn bad_protocol_and_empty_host_are_rejected() {
        let mut profile = Profile::new("gw");
        profile.protocol = "http".into();
        assert!(matches!(
            profile_to_gateway_config(&profile, "x", &Defaults::default()),
            Err(ConfigError::Validation { ref field, .. }) if field == "protocol"
        ));

        let empty = Profile::new("");
        assert!(matches!(
            profile_to_gateway_config(&empty, "x", &Defaults::default()),
            Err(ConfigError::Validation { ref field, .. }) if field == "host"
        ));
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut profile = Profile::new("10.0.0.2");
        profile.access_token_env = Some("HOME_GW_TOKEN".into());
        cfg.profiles.insert("default".into(), profile);
        save_config_to(&path, &cfg).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.host, "10.0.0.2");
        assert_eq!(profile.access_token_env.as_deref(), Some("HOME_GW_TOKEN"));
        assert_eq!(loaded.defaults.timeout, 30);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    }
}
