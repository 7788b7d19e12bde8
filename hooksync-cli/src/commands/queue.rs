//! `hooksync queue`: queue inspection.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use hooksync_core::Config;
use hooksync_sync::{Artifact, Lane, RetryQueue};

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// List queued change-sets in both lanes.
    List(ListArgs),
}

/// Arguments for `hooksync queue list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show change-sets that failed.
    #[arg(long, conflicts_with = "pending")]
    pub failed: bool,

    /// Only show change-sets waiting for their first run.
    #[arg(long)]
    pub pending: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(command: QueueCommand, config: &Config) -> Result<()> {
    match command {
        QueueCommand::List(args) => list(args, config),
    }
}

#[derive(Serialize)]
struct QueueEntry {
    #[serde(flatten)]
    artifact: Artifact,
    size: u64,
    queued_at: Option<DateTime<Local>>,
}

#[derive(Tabled)]
struct QueueTableRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "lane")]
    lane: String,
    #[tabled(rename = "size")]
    size: u64,
    #[tabled(rename = "queued")]
    queued: String,
}

fn list(args: ListArgs, config: &Config) -> Result<()> {
    let queue = RetryQueue::new(&config.queue_dir, &config.filename_prefix);
    let lanes: &[Lane] = if args.failed {
        &[Lane::Failed]
    } else if args.pending {
        &[Lane::Pending]
    } else {
        &[Lane::Pending, Lane::Failed]
    };

    let mut entries = Vec::new();
    for lane in lanes {
        let artifacts = queue
            .list(*lane)
            .with_context(|| format!("failed to list {lane} change-sets"))?;
        entries.extend(artifacts.into_iter().map(entry));
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("failed to serialize queue JSON")?
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("Queue {} is empty.", queue.dir().display());
        return Ok(());
    }

    let rows: Vec<QueueTableRow> = entries
        .into_iter()
        .map(|e| QueueTableRow {
            file: e.artifact.file_name,
            lane: e.artifact.lane.to_string(),
            size: e.size,
            queued: e
                .queued_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn entry(artifact: Artifact) -> QueueEntry {
    let meta = std::fs::metadata(&artifact.path).ok();
    QueueEntry {
        size: meta.as_ref().map(|m| m.len()).unwrap_or(0),
        queued_at: meta
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Local>::from),
        artifact,
    }
}
