//! CLI-specific config resolution: profile + flag overrides → `GatewayConfig`.

use std::collections::hash_map::Entry;
use std::time::Duration;

use secrecy::SecretString;

use deconz_config::{Config, Profile};
use deconz_core::GatewayConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Profile selected by `--profile`, else the config's default, else `default`.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `GatewayConfig` from the config file, active profile and flags.
///
/// Flags win over profile values. Without a profile, `--host` is required.
pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<GatewayConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut config = match cfg.profiles.get(&profile_name) {
        Some(profile) => {
            let mut overridden = profile.clone();
            if let Some(ref host) = global.host {
                overridden.host.clone_from(host);
            }
            deconz_config::profile_to_gateway_config(&overridden, &profile_name, &cfg.defaults)?
        }
        None => {
            let Some(host) = global.host.as_deref() else {
                if global.profile.is_some() {
                    cfg.profile(&profile_name)?;
                }
                return Err(CliError::NoConfig {
                    path: deconz_config::config_path().display().to_string(),
                });
            };
            let mut config = GatewayConfig::new(host);
            config.timeout = Duration::from_secs(cfg.defaults.timeout);
            config
        }
    };

    if let Some(port) = global.port {
        config.port = port;
    }
    if let Some(ws_port) = global.ws_port {
        config.ws_port = ws_port;
    }
    if let Some(timeout) = global.timeout {
        config.timeout = Duration::from_secs(timeout);
    }
    if let Some(ref token) = global.token {
        config.access_token = Some(SecretString::from(token.clone()));
    }

    Ok(config)
}

/// Like [`resolve`], but fails if no access token could be found.
pub fn resolve_authenticated(
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<GatewayConfig, CliError> {
    let config = resolve(global, cfg)?;
    if config.access_token.is_none() {
        return Err(CliError::NoCredentials {
            profile: active_profile_name(global, cfg),
        });
    }
    Ok(config)
}

/// The profile `config init` and `pair --save` write to, created from the
/// global flags if it does not exist yet.
pub fn profile_for_update<'a>(
    global: &GlobalOpts,
    cfg: &'a mut Config,
    profile_name: &str,
) -> Result<&'a mut Profile, CliError> {
    let profile = match cfg.profiles.entry(profile_name.to_owned()) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            let host = global.host.clone().ok_or_else(|| CliError::Validation {
                field: "host".into(),
                reason: format!("profile '{profile_name}' does not exist; pass --host to create it"),
            })?;
            entry.insert(Profile::new(host))
        }
    };

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = port;
    }
    if let Some(ws_port) = global.ws_port {
        profile.ws_port = ws_port;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok(profile)
}
