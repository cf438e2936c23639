//! Clap derive structures for the `mycomize` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use mycomize_core::Stage;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mycomize -- gateway integration for Mycomize grows
#[derive(Debug, Parser)]
#[command(
    name = "mycomize",
    version,
    about = "Connect home-automation gateways to Mycomize grows",
    long_about = "Manage Home-Assistant-compatible gateways from the command line.\n\n\
        Probe gateway health, browse entity catalogs, and link sensors and\n\
        switches to the cultivation stages of your grows.",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "MYCOMIZE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 'b', env = "MYCOMIZE_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Backend session token
    #[arg(long, env = "MYCOMIZE_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// User the session belongs to (namespaces filter preferences)
    #[arg(long, short = 'u', env = "MYCOMIZE_USER", global = true)]
    pub user: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MYCOMIZE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed gateway certificates
    #[arg(long, short = 'k', env = "MYCOMIZE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MYCOMIZE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage gateways and check their health
    #[command(alias = "gw", alias = "g")]
    Gateways(GatewaysArgs),

    /// Browse a gateway's entity catalog
    #[command(alias = "ent", alias = "e")]
    Entities(EntitiesArgs),

    /// Link entities to grow stages
    #[command(alias = "l")]
    Links(LinksArgs),

    /// Domain and device-class filters for the linkable list
    #[command(alias = "f")]
    Filters(FiltersArgs),

    /// Hand a scanned API key to the next gateway edit
    Credential(CredentialArgs),

    /// Poll live values of a gateway's linked entities
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GATEWAYS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GatewaysArgs {
    #[command(subcommand)]
    pub command: GatewaysCommand,
}

#[derive(Debug, Subcommand)]
pub enum GatewaysCommand {
    /// List gateways
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one gateway
    Show {
        /// Gateway ID
        id: i64,

        /// Also probe the gateway and include its status
        #[arg(long)]
        probe: bool,
    },

    /// Register a gateway
    Create {
        /// Display name
        #[arg(long)]
        name: String,

        /// Gateway base URL (e.g. http://homeassistant.local:8123)
        #[arg(long)]
        url: String,

        /// Long-lived access token (prompted when omitted)
        #[arg(long, env = "MYCOMIZE_GATEWAY_KEY", hide_env = true)]
        key: Option<String>,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,

        /// Skip the connection probe after saving
        #[arg(long)]
        no_probe: bool,
    },

    /// Edit a gateway; only the given fields change
    Update {
        /// Gateway ID
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        url: Option<String>,

        /// New access token
        #[arg(long, env = "MYCOMIZE_GATEWAY_KEY", hide_env = true)]
        key: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Take the API key from a previously stashed scan
        #[arg(long, conflicts_with = "key")]
        scanned: bool,
    },

    /// Delete a gateway and its entity links
    #[command(alias = "rm")]
    Delete {
        /// Gateway ID
        id: i64,
    },

    /// Check reachability, latency and version
    Probe {
        /// Gateway ID
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Rows to skip
    #[arg(long, default_value = "0")]
    pub skip: u32,

    /// Maximum rows to return
    #[arg(long, default_value = "100")]
    pub limit: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ENTITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    #[command(subcommand)]
    pub command: EntitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntitiesCommand {
    /// Entities that can still be linked (filters apply)
    Linkable(CatalogArgs),

    /// Entities already linked to a grow (filters never hide these)
    Linked(CatalogArgs),

    /// Linked / linkable counts
    Counts {
        /// Gateway ID
        gateway: i64,
    },
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Gateway ID
    pub gateway: i64,

    /// Case-insensitive match on friendly name or entity id
    #[arg(long, short = 's', default_value = "")]
    pub search: String,

    /// Bypass the catalog cache
    #[arg(long, short = 'r')]
    pub refresh: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LINKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LinksArgs {
    #[command(subcommand)]
    pub command: LinksCommand,
}

#[derive(Debug, Subcommand)]
pub enum LinksCommand {
    /// List links, optionally for one grow or stage
    #[command(alias = "ls")]
    List {
        /// Restrict to one gateway
        #[arg(long, short = 'g')]
        gateway: Option<i64>,

        /// Restrict to one grow
        #[arg(long)]
        grow: Option<i64>,

        /// Restrict to one stage (requires --grow)
        #[arg(long, requires = "grow")]
        stage: Option<Stage>,
    },

    /// Link one or more entities to a grow stage
    Add {
        /// Gateway ID
        gateway: i64,

        /// Entity ids (e.g. sensor.tent_humidity)
        #[arg(required = true)]
        entities: Vec<String>,

        /// Grow ID
        #[arg(long)]
        grow: i64,

        /// Cultivation stage
        #[arg(long)]
        stage: Stage,
    },

    /// Unlink one or more entities
    #[command(alias = "rm")]
    Remove {
        /// Gateway ID
        gateway: i64,

        /// Entity ids
        #[arg(required = true)]
        entities: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FILTERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FiltersArgs {
    #[command(subcommand)]
    pub command: FiltersCommand,
}

#[derive(Debug, Subcommand)]
pub enum FiltersCommand {
    /// Show the saved filters
    Show,

    /// Replace the domain and/or device-class filters
    Set {
        /// Domains to show (repeatable; none means all)
        #[arg(long = "domain", short = 'd')]
        domains: Vec<String>,

        /// Device classes to show (repeatable; none means all)
        #[arg(long = "device-class", short = 'c')]
        device_classes: Vec<String>,

        /// Show every domain
        #[arg(long, conflicts_with = "domains")]
        all_domains: bool,

        /// Show every device class
        #[arg(long, conflicts_with = "device_classes")]
        all_device_classes: bool,
    },

    /// Toggle a single domain
    ToggleDomain { domain: String },

    /// Toggle a single device class
    ToggleDeviceClass { class: String },

    /// Show everything again
    Reset,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CREDENTIAL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CredentialArgs {
    #[command(subcommand)]
    pub command: CredentialCommand,
}

#[derive(Debug, Subcommand)]
pub enum CredentialCommand {
    /// Store a scanned API key for the next `gateways update --scanned`
    Stash {
        /// The scanned value (read from stdin when omitted)
        value: Option<String>,
    },

    /// Discard a stashed value
    Clear,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Gateway ID
    pub gateway: i64,

    /// Poll interval (e.g. "10s", "1m"; overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<humantime::Duration>,

    /// Exit after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (backend, user_id, token_env, ca_cert, insecure, timeout, ...)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the backend session token in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file path
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
