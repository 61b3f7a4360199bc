//! Light, sensor and group command handlers.

use tabled::Tabled;

use deconz_core::{
    DeviceCommand, Gateway, LightStateUpdate, ResourceKind, ResourceOption, resource_id,
};

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand, LightsArgs, LightsCommand, SensorsArgs, SensorsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type | Model | Manufacturer")]
    details: String,
}

impl From<&ResourceOption> for ResourceRow {
    fn from(option: &ResourceOption) -> Self {
        Self {
            id: resource_id(&option.value).to_owned(),
            name: option.name.clone(),
            details: option.description.clone(),
        }
    }
}

fn print_options(options: &[ResourceOption], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(&global.output, options, |o| ResourceRow::from(o), |o| {
        resource_id(&o.value).to_owned()
    })?;
    output::print_output(&out);
    Ok(())
}

async fn run_device(
    command: DeviceCommand,
    gateway: &Gateway,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let value = gateway.execute(&command).await?;
    output::print_output(&output::render_value(&global.output, &value)?);
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_lights(
    args: LightsArgs,
    gateway: &Gateway,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        LightsCommand::List => {
            let options = gateway.resource_options(ResourceKind::Lights).await?;
            print_options(&options, global)
        }
        LightsCommand::Get { id } => {
            let id = resource_id(&id).to_owned();
            run_device(DeviceCommand::ReadLight { id }, gateway, global).await
        }
        LightsCommand::Set { id, on, off, bri } => {
            let mut update = LightStateUpdate::new(on && !off);
            if let Some(bri) = bri {
                update = update.with_brightness(bri);
            }
            let id = resource_id(&id).to_owned();
            run_device(DeviceCommand::UpdateLight { id, update }, gateway, global).await
        }
    }
}

pub async fn handle_sensors(
    args: SensorsArgs,
    gateway: &Gateway,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SensorsCommand::List => {
            let options = gateway.resource_options(ResourceKind::Sensors).await?;
            print_options(&options, global)
        }
        SensorsCommand::Get { id } => {
            let id = resource_id(&id).to_owned();
            run_device(DeviceCommand::ReadSensor { id }, gateway, global).await
        }
    }
}

pub async fn handle_groups(
    args: GroupsArgs,
    gateway: &Gateway,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        GroupsCommand::List => {
            let options = gateway.group_options().await?;
            print_options(&options, global)
        }
    }
}
