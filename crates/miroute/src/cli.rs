//! Clap derive structures for the `miroute` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-level CLI ────────────────────────────────────────────────────

/// miroute -- poll and monitor Xiaomi MiWiFi routers
#[derive(Debug, Parser)]
#[command(
    name = "miroute",
    version,
    about = "Monitor Xiaomi MiWiFi routers from the command line",
    long_about = "Polls one or more MiWiFi routers over the stock Luci HTTP API:\n\
        system vitals, WAN state, wireless radios, mesh topology, firmware,\n\
        and the devices connected to each of them.",
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

// ── Global options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, env = "MIROUTE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Router to target, by profile name or address
    #[arg(long, short = 'r', env = "MIROUTE_ROUTER", global = true)]
    pub router: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "MIROUTE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MIROUTE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & color enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if stdout is a terminal)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll every configured router and stream events until Ctrl-C
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Run one polling cycle and print a router summary
    #[command(alias = "st")]
    Status,

    /// Run one polling cycle and list tracked devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds, overriding configured values
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Include devices that are currently offline
    #[arg(long, short = 'a')]
    pub all: bool,
}
