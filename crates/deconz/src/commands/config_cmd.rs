//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use deconz_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Resolved settings as shown by `config show`.
#[derive(Serialize)]
struct ResolvedView {
    profile: String,
    host: String,
    port: u16,
    stream_url: String,
    timeout_secs: u64,
    access_token: &'static str,
}

#[derive(Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Default")]
    default: String,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            protocol,
            token_env,
            default,
        } => {
            let mut cfg = deconz_config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = config::profile_for_update(global, &mut cfg, &profile_name)?;
            profile.protocol = protocol;
            if token_env.is_some() {
                profile.access_token_env = token_env;
            }
            if default || cfg.default_profile.is_none() {
                cfg.default_profile = Some(profile_name.clone());
            }
            deconz_config::save_config(&cfg)?;
            eprintln!(
                "Profile '{profile_name}' written to {}",
                deconz_config::config_path().display()
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = deconz_config::load_config()?;
            let resolved = config::resolve(global, &cfg)?;
            let view = ResolvedView {
                profile: config::active_profile_name(global, &cfg),
                host: resolved.host.clone(),
                port: resolved.port,
                stream_url: resolved.stream_url(),
                timeout_secs: resolved.timeout.as_secs(),
                access_token: if resolved.access_token.is_some() {
                    "set"
                } else {
                    "not set"
                },
            };
            let out = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&view)?,
                OutputFormat::Table | OutputFormat::Plain => format!(
                    "Profile:      {}\nHost:         {}\nREST port:    {}\nStream URL:   {}\nTimeout:      {}s\nAccess token: {}",
                    view.profile,
                    view.host,
                    view.port,
                    view.stream_url,
                    view.timeout_secs,
                    view.access_token
                ),
            };
            output::print_output(&out);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&deconz_config::config_path().display().to_string());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = deconz_config::load_config()?;
            let rows = profile_rows(&cfg);
            let out = output::render_list(
                &global.output,
                &rows,
                |row| ProfileRow {
                    name: row.name.clone(),
                    host: row.host.clone(),
                    default: row.default.clone(),
                },
                |row| row.name.clone(),
            )?;
            output::print_output(&out);
            Ok(())
        }
    }
}

fn profile_rows(cfg: &Config) -> Vec<ProfileRow> {
    cfg.profile_names()
        .into_iter()
        .filter_map(|name| {
            cfg.profiles.get(name).map(|profile| ProfileRow {
                name: name.to_owned(),
                host: profile.host.clone(),
                default: if cfg.default_profile.as_deref() == Some(name) {
                    "*".into()
                } else {
                    String::new()
                },
            })
        })
        .collect()
}
