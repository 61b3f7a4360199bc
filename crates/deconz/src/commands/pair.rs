//! `deconz pair`: acquire an access token from an unlocked gateway.

use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use deconz_core::Gateway;

use crate::cli::{GlobalOpts, PairArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: PairArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = if args.save {
        deconz_config::load_config()?
    } else {
        deconz_config::load_config_or_default()
    };
    let gateway = Gateway::new(config::resolve(global, &cfg)?)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    eprintln!(
        "Requesting an access token from {} (unlock the gateway now)...",
        gateway.client().base_url()
    );
    let token = gateway.pair(args.retries, cancel).await?;

    if !args.save {
        output::print_output(token.expose_secret());
        return Ok(());
    }

    let profile_name = config::active_profile_name(global, &cfg);
    let profile = config::profile_for_update(global, &mut cfg, &profile_name)?;
    if args.plaintext {
        profile.access_token = Some(token.expose_secret().to_owned());
    } else {
        deconz_config::store_access_token(&profile_name, &token)?;
        profile.access_token = None;
    }
    if cfg.default_profile.is_none() {
        cfg.default_profile = Some(profile_name.clone());
    }
    deconz_config::save_config(&cfg)?;

    eprintln!("Access token saved for profile '{profile_name}'");
    Ok(())
}
