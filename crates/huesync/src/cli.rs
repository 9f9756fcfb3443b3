//! Clap derive structures for the `huesync` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// huesync -- keep a local mirror of a lighting hub in sync
#[derive(Debug, Parser)]
#[command(
    name = "huesync",
    version,
    about = "Sync with Hue-compatible lighting hubs from the command line",
    long_about = "Polls a Hue-compatible lighting hub for lights, sensors, and groups,\n\
        reports every change, and sends commands back to the hub.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "HUESYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Hub address (overrides the config file)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// Hub credential (overrides the config file)
    #[arg(long, global = true, hide_env = true, env = "HUESYNC_CREDENTIAL")]
    pub credential: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the hub and log every change until interrupted
    Run,

    /// List lights
    #[command(alias = "l")]
    Lights,

    /// List sensors
    #[command(alias = "s")]
    Sensors,

    /// List groups with state derived from their lights
    #[command(alias = "g")]
    Groups,

    /// Ask the hub to search for new lights
    Search(SearchArgs),

    /// Obtain a credential from the hub (press its pairing button)
    Pair(PairArgs),

    /// Show hub identity
    Info,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Restrict the search to these serial numbers
    #[arg(long = "serial", value_name = "SERIAL")]
    pub serials: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PairArgs {
    /// How many times to ask the hub before giving up
    #[arg(long, default_value = "30")]
    pub attempts: u32,

    /// Seconds between attempts
    #[arg(long, default_value = "2")]
    pub interval: u64,
}
