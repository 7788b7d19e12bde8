//! hooksync: apply queued push change-sets to deployed repository trees.
//!
//! # Usage
//!
//! ```text
//! hooksync sync [--retry] [--json]
//! hooksync retry [--json]
//! hooksync setup <repository> [--owner <owner>] [--clean] [--json]
//! hooksync queue list [--failed | --pending] [--json]
//! ```
//!
//! Every subcommand accepts `--config <path>` (default
//! `~/.hooksync/config.yaml`) and `--verbose`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{queue::QueueCommand, setup::SetupArgs, sync::RetryArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "hooksync",
    version,
    about = "Apply queued push change-sets to deployed repository trees",
    long_about = None,
)]
struct Cli {
    /// Config file to use instead of ~/.hooksync/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log every file operation.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process pending change-sets in the queue directory.
    Sync(SyncArgs),

    /// Process change-sets that failed on an earlier run.
    Retry(RetryArgs),

    /// Seed a destination from the full branch archive.
    Setup(SetupArgs),

    /// Inspect the queue directory.
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;
    init_tracing(cli.verbose || config.verbose);

    match cli.command {
        Commands::Sync(args) => args.run(&config),
        Commands::Retry(args) => args.run(&config),
        Commands::Setup(args) => args.run(&config),
        Commands::Queue { command } => commands::queue::run(command, &config),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
