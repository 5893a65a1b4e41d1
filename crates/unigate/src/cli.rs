//! Clap derive structures for the `unigate` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// unigate -- session gateway CLI for UniFi-style network controllers
#[derive(Debug, Parser)]
#[command(
    name = "unigate",
    version,
    about = "Inspect and exercise a controller connection from the command line",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "UNIGATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, short = 'c', env = "UNIGATE_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Site name
    #[arg(long, short = 's', env = "UNIGATE_SITE", global = true)]
    pub site: Option<String>,

    /// Login username (overrides profile)
    #[arg(long, short = 'u', env = "UNIGATE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Controller type: skip detection and force a path family
    #[arg(long, default_value = "auto", global = true)]
    pub controller_type: ControllerTypeArg,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "UNIGATE_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "UNIGATE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "UNIGATE_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ControllerTypeArg {
    /// Detect empirically after login
    Auto,
    /// Force the /proxy/network path prefix
    Proxied,
    /// Force direct (no prefix) paths
    Direct,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and report session status
    #[command(alias = "st")]
    Status,

    /// Run controller-type detection and report the outcome
    Detect,

    /// List or switch sites
    Sites(SitesArgs),

    /// Site health summary
    Health,

    /// Controller system info
    Sysinfo,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),
}

// ── SITES ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List sites visible to this account
    #[command(alias = "ls")]
    List,

    /// Switch the profile's target site
    Switch {
        /// Site short name
        name: String,
    },
}

// ── CONFIG ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}
