//! Clap derive structures for the `deconz` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// deconz -- control a deCONZ Zigbee gateway from the command line
#[derive(Debug, Parser)]
#[command(
    name = "deconz",
    version,
    about = "Control deCONZ Zigbee gateways from the command line",
    long_about = "Read and switch lights, read sensors, and follow the gateway's \
        live event stream.\n\n\
        Pair once with `deconz pair --save` while the gateway's link button is unlocked.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "DECONZ_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway host or IP (overrides profile)
    #[arg(long, short = 'H', env = "DECONZ_HOST", global = true)]
    pub host: Option<String>,

    /// REST API port (overrides profile)
    #[arg(long, env = "DECONZ_PORT", global = true)]
    pub port: Option<u16>,

    /// Event stream port (overrides profile)
    #[arg(long, env = "DECONZ_WS_PORT", global = true)]
    pub ws_port: Option<u16>,

    /// Access token (overrides profile and keyring)
    #[arg(long, env = "DECONZ_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "DECONZ_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// One identifier per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Obtain an access token (press the link button first)
    Pair(PairArgs),

    /// Read and switch lights
    #[command(alias = "l")]
    Lights(LightsArgs),

    /// Read sensors
    #[command(alias = "s")]
    Sensors(SensorsArgs),

    /// List groups
    #[command(alias = "g")]
    Groups(GroupsArgs),

    /// Follow the gateway event stream
    Watch(WatchArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),
}

// ── Pair ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PairArgs {
    /// Additional attempts while the link button is not pressed (one per second)
    #[arg(long, default_value_t = 60)]
    pub retries: u32,

    /// Store the token for the active profile instead of printing it
    #[arg(long)]
    pub save: bool,

    /// With --save, write the token into the config file instead of the keyring
    #[arg(long, requires = "save")]
    pub plaintext: bool,
}

// ── Lights ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightsArgs {
    #[command(subcommand)]
    pub command: LightsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightsCommand {
    /// List lights
    #[command(alias = "ls")]
    List,

    /// Show a light's full state
    Get {
        /// Light id (or `id:name` picker value)
        id: String,
    },

    /// Switch a light and optionally set its brightness
    Set {
        /// Light id (or `id:name` picker value)
        id: String,

        /// Turn the light on
        #[arg(long, conflicts_with = "off", required_unless_present = "off")]
        on: bool,

        /// Turn the light off
        #[arg(long)]
        off: bool,

        /// Brightness (1-254)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=254))]
        bri: Option<u8>,
    },
}

// ── Sensors ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SensorsArgs {
    #[command(subcommand)]
    pub command: SensorsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SensorsCommand {
    /// List sensors
    #[command(alias = "ls")]
    List,

    /// Show a sensor's full state
    Get {
        /// Sensor id (or `id:name` picker value)
        id: String,
    },
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List groups
    #[command(alias = "ls")]
    List,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Resource collection to watch
    #[arg(long, short = 'r', default_value = "sensors")]
    pub resource: WatchResource,

    /// Resource id (or `id:name` picker value)
    #[arg(long)]
    pub id: String,

    /// Event type to match
    #[arg(long, short = 'e', default_value = "changed")]
    pub event: WatchEvent,

    /// Exit after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WatchResource {
    Lights,
    Sensors,
    Groups,
    Scenes,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WatchEvent {
    Added,
    Changed,
    Deleted,
    SceneCalled,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile from --host, --port and --ws-port
    Init {
        /// Event stream scheme
        #[arg(long, default_value = "ws", value_parser = ["ws", "wss"])]
        protocol: String,

        /// Read the access token from this environment variable
        #[arg(long)]
        token_env: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Show the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List profile names
    Profiles,
}
