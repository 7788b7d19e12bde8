//! Queue orchestration: one invocation drains one lane of the queue.
//!
//! Per artifact: read → parse → resolve target → branch check → plan →
//! apply → reap → settle. Artifacts are isolated from each other; a failing
//! artifact never stops the run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hooksync_core::{Config, MismatchPolicy};

use crate::apply::{apply_delete, apply_fetch, OpOutcome};
use crate::changeset::{self, BranchCheck};
use crate::error::SyncError;
use crate::fetch::RemoteFetcher;
use crate::plan::{self, FileOp, RunContext};
use crate::queue::{Artifact, Lane, RetryQueue};
use crate::reap;

/// Which lane an invocation drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Process pending artifacts; failures move to the failed lane.
    Normal,
    /// Process previously failed artifacts only.
    Retry,
}

impl RunMode {
    pub fn lane(self) -> Lane {
        match self {
            RunMode::Normal => Lane::Pending,
            RunMode::Retry => Lane::Failed,
        }
    }
}

/// How one artifact ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    /// Every operation succeeded; the artifact was removed from the queue.
    Applied,
    /// Pushed to a branch this destination does not track.
    Skipped { found_ref: String, discarded: bool },
    /// Rejected outright, or at least one operation failed.
    Failed { reason: String },
}

/// A single operation that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpFailure {
    pub op: FileOp,
    pub error: String,
}

/// Everything that happened to one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub file_name: String,
    pub repository: Option<String>,
    pub outcome: ArtifactOutcome,
    pub applied: Vec<OpOutcome>,
    pub failures: Vec<OpFailure>,
    pub reaped: usize,
    /// Set when moving the artifact within the queue failed afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_error: Option<String>,
}

impl ArtifactReport {
    fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            repository: None,
            outcome: ArtifactOutcome::Applied,
            applied: Vec::new(),
            failures: Vec::new(),
            reaped: 0,
            settle_error: None,
        }
    }

    fn rejected(mut self, err: &SyncError) -> Self {
        self.outcome = ArtifactOutcome::Failed {
            reason: err.to_string(),
        };
        self
    }
}

/// Summary of one engine invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub artifacts: Vec<ArtifactReport>,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&ArtifactOutcome) -> bool) -> usize {
        self.artifacts.iter().filter(|a| pred(&a.outcome)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Failed { .. }))
    }
}

/// The reconciliation engine.
pub struct Engine<'a> {
    config: &'a Config,
    fetcher: &'a dyn RemoteFetcher,
    queue: RetryQueue,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a Config, fetcher: &'a dyn RemoteFetcher) -> Self {
        Self {
            queue: RetryQueue::new(&config.queue_dir, &config.filename_prefix),
            config,
            fetcher,
        }
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// Process every artifact in the lane `mode` selects.
    ///
    /// Only an unreadable queue directory is an error; artifact failures are
    /// reported in the returned [`RunReport`].
    pub fn run(&self, mode: RunMode) -> Result<RunReport, SyncError> {
        let started_at = Utc::now();
        let artifacts = self.queue.list(mode.lane())?;
        tracing::info!(
            "{} {} artifact(s) in {}",
            mode_verb(mode),
            artifacts.len(),
            self.queue.dir().display()
        );

        let mut reports = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            tracing::info!("processing file {}", artifact.file_name);
            let mut report = self.process(artifact);
            self.settle(artifact, &mut report);
            reports.push(report);
        }

        Ok(RunReport {
            mode,
            started_at,
            artifacts: reports,
        })
    }

    /// Apply one artifact to disk without moving it in the queue.
    pub fn process(&self, artifact: &Artifact) -> ArtifactReport {
        let report = ArtifactReport::new(&artifact.file_name);

        let raw = match self.queue.read(artifact) {
            Ok(raw) => raw,
            Err(err) => return report.rejected(&err),
        };
        let payload = match changeset::parse(&raw) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("invalid change-set in {}: {err}", artifact.file_name);
                return report.rejected(&err);
            }
        };

        let mut report = ArtifactReport {
            repository: Some(payload.repository.full_name.clone()),
            ..report
        };

        let target = match self.config.deploy_target(&payload.repository.name) {
            Ok(target) => target,
            Err(err) => {
                let err = SyncError::from(err);
                tracing::warn!("{err}");
                return report.rejected(&err);
            }
        };

        if let BranchCheck::Mismatch { found } = changeset::check_branch(&payload, &target.branch)
        {
            tracing::info!(
                "skipping {}: pushed to {found}, deploying {}",
                artifact.file_name,
                target.branch
            );
            report.outcome = ArtifactOutcome::Skipped {
                found_ref: found,
                discarded: false,
            };
            return report;
        }

        let mut ctx = RunContext::new();
        let ops = plan::plan(&payload, &mut ctx);
        for op in ops {
            let result = match &op {
                FileOp::Fetch(path) => {
                    apply_fetch(self.fetcher, &payload.repository.full_name, &target, path)
                }
                FileOp::Delete(path) => apply_delete(&mut ctx, &target, path),
            };
            match result {
                Ok(outcome) => report.applied.push(outcome),
                Err(err) => {
                    tracing::warn!("{err}");
                    report.failures.push(OpFailure {
                        op,
                        error: err.to_string(),
                    });
                }
            }
        }

        report.reaped = reap::reap(&ctx.take_reap_set());

        if !report.failures.is_empty() {
            report.outcome = ArtifactOutcome::Failed {
                reason: format!(
                    "{} of {} operation(s) failed",
                    report.failures.len(),
                    report.failures.len() + report.applied.len()
                ),
            };
        }
        report
    }

    /// Move the artifact according to its outcome.
    fn settle(&self, artifact: &Artifact, report: &mut ArtifactReport) {
        let result = match &mut report.outcome {
            ArtifactOutcome::Applied => self.queue.mark_applied(artifact),
            ArtifactOutcome::Failed { .. } => {
                tracing::warn!("could not process file {}", artifact.file_name);
                self.queue.mark_failed(artifact).map(|_| ())
            }
            ArtifactOutcome::Skipped { discarded, .. } => match self.config.on_branch_mismatch {
                MismatchPolicy::Discard => {
                    *discarded = true;
                    self.queue.discard(artifact)
                }
                MismatchPolicy::Keep => Ok(()),
            },
        };
        if let Err(err) = result {
            tracing::warn!("could not settle {}: {err}", artifact.file_name);
            report.settle_error = Some(err.to_string());
        }
    }
}

fn mode_verb(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Normal => "syncing",
        RunMode::Retry => "retrying",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
