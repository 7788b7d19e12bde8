//! File-op planning and the per-artifact run context.
//!
//! The planner walks commits in delivery order and emits fetch operations for
//! added and modified paths and delete operations for removed paths. A path
//! fetched earlier in the same artifact is not fetched again, unless a later
//! commit deleted it first; the delete clears its processed flag so a re-add
//! is honoured.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Serialize;

use crate::changeset::ChangeSetPayload;

/// A single planned file operation, relative to the deploy root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "path", rename_all = "snake_case")]
pub enum FileOp {
    /// Fetch the path from the remote and write it locally.
    Fetch(String),
    /// Delete the path locally.
    Delete(String),
}

impl FileOp {
    pub fn path(&self) -> &str {
        match self {
            FileOp::Fetch(path) | FileOp::Delete(path) => path,
        }
    }
}

/// State scoped to the processing of one artifact.
///
/// Owned by the engine, handed to the planner and the applier, then dropped.
/// Nothing in it survives to the next artifact.
#[derive(Debug, Default)]
pub struct RunContext {
    /// `true` = fetched in this run; `false` = deleted, may be fetched again.
    processed: HashMap<String, bool>,
    /// Absolute parent directory → relative directory for display.
    reap: BTreeMap<PathBuf, String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processed(&self, path: &str) -> bool {
        self.processed.get(path).copied().unwrap_or(false)
    }

    pub(crate) fn mark_fetched(&mut self, path: &str) {
        self.processed.insert(path.to_string(), true);
    }

    pub(crate) fn mark_deleted(&mut self, path: &str) {
        self.processed.insert(path.to_string(), false);
    }

    /// Remember `dir` as a candidate for removal once the artifact is done.
    pub fn record_reap(&mut self, dir: PathBuf, display: String) {
        self.reap.insert(dir, display);
    }

    pub fn reap_set(&self) -> &BTreeMap<PathBuf, String> {
        &self.reap
    }

    /// Hand the collected reap candidates to the reaper.
    pub fn take_reap_set(&mut self) -> BTreeMap<PathBuf, String> {
        std::mem::take(&mut self.reap)
    }
}

/// Build the ordered operation list for `payload`.
pub fn plan(payload: &ChangeSetPayload, ctx: &mut RunContext) -> Vec<FileOp> {
    let mut ops = Vec::new();
    for commit in &payload.commits {
        tracing::debug!("change-set: {}", commit.message.trim());

        for path in commit.added.iter().chain(commit.modified.iter()) {
            if ctx.is_processed(path) {
                continue;
            }
            ctx.mark_fetched(path);
            ops.push(FileOp::Fetch(path.clone()));
        }

        for path in &commit.removed {
            ctx.mark_deleted(path);
            ops.push(FileOp::Delete(path.clone()));
        }
    }
    ops
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
