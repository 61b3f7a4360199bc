//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod pair;
pub mod resources;
pub mod watch;

use deconz_core::Gateway;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a gateway-bound command to its handler.
pub async fn dispatch(cmd: Command, gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Lights(args) => resources::handle_lights(args, gateway, global).await,
        Command::Sensors(args) => resources::handle_sensors(args, gateway, global).await,
        Command::Groups(args) => resources::handle_groups(args, gateway, global).await,
        Command::Watch(args) => watch::handle(args, gateway).await,
        Command::Pair(_) | Command::Config(_) => Err(CliError::Internal(
            "command does not use a gateway session".into(),
        )),
    }
}
