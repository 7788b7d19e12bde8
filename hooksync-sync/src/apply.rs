//! Filesystem applier: executes planned operations against a deploy root.
//!
//! ## Fetch: 4-step protocol
//!
//! 1. Resolve the relative path under the deploy root (no `..`, no absolute paths).
//! 2. Fetch from the remote; one more attempt on a retryable failure.
//! 3. Ensure the parent directory exists.
//! 4. Write to `<path>.hooksync.tmp`, then rename over the final path.
//!
//! Deletes record the parent directory for the reaper whether or not the
//! file was there.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use hooksync_core::DeployTarget;

use crate::error::{io_err, SyncError};
use crate::fetch::{FetchError, RemoteFetcher};
use crate::plan::RunContext;

/// Outcome of an individual file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OpOutcome {
    /// Remote content was written to `path`.
    Written { path: PathBuf, bytes: usize },
    /// The local file was deleted.
    Removed { path: PathBuf },
    /// Nothing to delete; not a failure.
    AlreadyAbsent { path: PathBuf },
}

/// Join `relative` onto `root`, rejecting anything that would leave `root`.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, SyncError> {
    let rel = Path::new(relative);
    let mut has_name = false;
    for component in rel.components() {
        match component {
            Component::Normal(_) => has_name = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SyncError::UnsafePath {
                    path: relative.to_string(),
                })
            }
        }
    }
    if !has_name {
        return Err(SyncError::UnsafePath {
            path: relative.to_string(),
        });
    }
    Ok(root.join(rel))
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Fetch `path` of `repository` at the target's branch and write it under the
/// target's destination, replacing whatever was there.
pub fn apply_fetch(
    fetcher: &dyn RemoteFetcher,
    repository: &str,
    target: &DeployTarget,
    path: &str,
) -> Result<OpOutcome, SyncError> {
    let dest = resolve(&target.destination, path)?;
    let bytes = fetch_with_retry(fetcher, repository, target.branch.as_str(), path).map_err(
        |source| SyncError::Fetch {
            path: path.to_string(),
            source,
        },
    )?;
    atomic_write(&dest, &bytes)?;
    tracing::debug!("synchronized {path}");
    Ok(OpOutcome::Written {
        path: dest,
        bytes: bytes.len(),
    })
}

/// One fetch, plus exactly one more when the first answer is retryable.
pub(crate) fn fetch_with_retry(
    fetcher: &dyn RemoteFetcher,
    repository: &str,
    branch: &str,
    path: &str,
) -> Result<Vec<u8>, FetchError> {
    match fetcher.fetch(repository, branch, path) {
        Err(err) if err.is_retryable() => {
            tracing::debug!("retrying {path} after: {err}");
            fetcher.fetch(repository, branch, path)
        }
        other => other,
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.hooksync.tmp", path.display()));
    atomic_write_with_tmp(path, bytes, &tmp)
}

fn atomic_write_with_tmp(path: &Path, bytes: &[u8], tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, bytes).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Delete `path` under the target's destination and queue its parent for reaping.
pub fn apply_delete(
    ctx: &mut RunContext,
    target: &DeployTarget,
    path: &str,
) -> Result<OpOutcome, SyncError> {
    let dest = resolve(&target.destination, path)?;
    if let Some(parent) = dest.parent() {
        let display = Path::new(path)
            .parent()
            .map(|p| p.display().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".to_string());
        ctx.record_reap(parent.to_path_buf(), display);
    }

    match std::fs::remove_file(&dest) {
        Ok(()) => {
            tracing::debug!("removed {path}");
            Ok(OpOutcome::Removed { path: dest })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("already absent: {path}");
            Ok(OpOutcome::AlreadyAbsent { path: dest })
        }
        Err(e) => Err(io_err(dest, e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
