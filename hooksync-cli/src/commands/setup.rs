//! `hooksync setup`: seed a destination from the branch archive.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use hooksync_core::Config;
use hooksync_sync::{bootstrap, BootstrapRequest, HttpFetcher};

/// Arguments for `hooksync setup`.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Short name of a repository listed under `repositories`.
    pub repository: String,

    /// Repository owner; defaults to `repo_owner` from the config.
    #[arg(long)]
    pub owner: Option<String>,

    /// Empty the destination before copying the archive over it.
    #[arg(long)]
    pub clean: bool,

    /// Emit the bootstrap report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SetupArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        let fetcher = HttpFetcher::from_config(config);
        let request = BootstrapRequest {
            repository: self.repository.clone(),
            owner: self.owner,
            clean: self.clean,
        };
        let report = bootstrap(config, &fetcher, &request)
            .with_context(|| format!("setup failed for '{}'", self.repository))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
            return Ok(());
        }

        println!(
            "{} '{}' ({}) copied to {} ({} files, {} bytes downloaded)",
            "✓".green().bold(),
            report.repository,
            report.branch,
            report.destination.display(),
            report.files_copied,
            report.archive_bytes,
        );
        if report.cleaned {
            println!("  previous contents removed first");
        }
        Ok(())
    }
}
