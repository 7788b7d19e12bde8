//! `hooksync sync` and `hooksync retry`: drain one lane of the queue.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use hooksync_core::Config;
use hooksync_sync::{
    ArtifactOutcome, ArtifactReport, Engine, HttpFetcher, OpOutcome, RunMode, RunReport,
};

/// Arguments for `hooksync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Process previously failed change-sets instead of pending ones.
    #[arg(long)]
    pub retry: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        let mode = if self.retry {
            RunMode::Retry
        } else {
            RunMode::Normal
        };
        run_lane(config, mode, self.json)
    }
}

/// Arguments for `hooksync retry`.
#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RetryArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        run_lane(config, RunMode::Retry, self.json)
    }
}

fn run_lane(config: &Config, mode: RunMode, json: bool) -> Result<()> {
    tracing::debug!(queue = %config.queue_dir.display(), mode = ?mode, "starting run");
    let fetcher = HttpFetcher::from_config(config);
    let report = Engine::new(config, &fetcher)
        .run(mode)
        .with_context(|| format!("failed to scan queue {}", config.queue_dir.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize run report")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    if report.artifacts.is_empty() {
        let lane = match report.mode {
            RunMode::Normal => "pending",
            RunMode::Retry => "failed",
        };
        println!("No {lane} change-sets in the queue.");
        return;
    }

    for artifact in &report.artifacts {
        print_artifact(artifact);
    }
    println!(
        "{} applied, {} skipped, {} failed",
        report.applied(),
        report.skipped(),
        report.failed()
    );
}

fn print_artifact(artifact: &ArtifactReport) {
    let repo = artifact
        .repository
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    match &artifact.outcome {
        ArtifactOutcome::Applied => {
            println!("{} {}{repo} applied", "✓".green().bold(), artifact.file_name)
        }
        ArtifactOutcome::Skipped {
            found_ref,
            discarded,
        } => {
            let action = if *discarded { "discarded" } else { "kept" };
            println!(
                "{} {}{repo} skipped: pushed to {found_ref} ({action})",
                "↷".yellow().bold(),
                artifact.file_name
            );
        }
        ArtifactOutcome::Failed { reason } => println!(
            "{} {}{repo} failed: {reason}",
            "✗".red().bold(),
            artifact.file_name
        ),
    }

    for op in &artifact.applied {
        match op {
            OpOutcome::Written { path, bytes } => {
                println!("  ✎  {} ({bytes} bytes)", path.display())
            }
            OpOutcome::Removed { path } => println!("  -  {}", path.display()),
            OpOutcome::AlreadyAbsent { path } => println!("  ·  {}", path.display()),
        }
    }
    for failure in &artifact.failures {
        println!("  {}  {}: {}", "✗".red(), failure.op.path(), failure.error);
    }
    if artifact.reaped > 0 {
        println!("  removed {} empty director(ies)", artifact.reaped);
    }
    if let Some(err) = &artifact.settle_error {
        println!("  {} {err}", "queue:".red());
    }
}
