//! Whole-tree copy and delete used by bootstrap.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{io_err, SyncError};

/// What [`delete_tree`] did with the directory it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeOutcome {
    /// Contents (and the root, when requested) are gone.
    Done,
    /// The directory, or something inside it, is protected and was kept.
    Protected,
    /// Nothing existed at the path.
    Missing,
}

/// Copy the contents of `src` into `dst`, creating `dst` as needed and
/// overwriting files already there. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize, SyncError> {
    std::fs::create_dir_all(dst).map_err(|e| io_err(dst, e))?;
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| walk_err(src, e))?;
        let path = entry.path();
        let rel = path.strip_prefix(src).map_err(|_| SyncError::UnsafePath {
            path: path.display().to_string(),
        })?;
        let target = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| io_err(&target, e))?;
        } else if file_type.is_symlink() && path.is_dir() {
            tracing::debug!("skipping directory symlink {}", path.display());
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            std::fs::copy(path, &target).map_err(|e| io_err(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Delete everything under `dir`, and `dir` itself when `delete_root` is set.
///
/// Any directory equal to one of `protected` is left alone, along with every
/// ancestor of it inside `dir`.
pub fn delete_tree(
    dir: &Path,
    delete_root: bool,
    protected: &[PathBuf],
) -> Result<TreeOutcome, SyncError> {
    let meta = match std::fs::symlink_metadata(dir) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TreeOutcome::Missing),
        Err(e) => return Err(io_err(dir, e)),
    };
    if !meta.is_dir() {
        std::fs::remove_file(dir).map_err(|e| io_err(dir, e))?;
        return Ok(TreeOutcome::Done);
    }

    let guarded: Vec<PathBuf> = protected
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();
    if is_guarded(dir, &guarded) {
        tracing::info!("contents of '{}' will not be cleaned up", dir.display());
        return Ok(TreeOutcome::Protected);
    }

    // Pre-order walk so protected subtrees are pruned before descent;
    // directories are removed afterwards, deepest first.
    let mut kept: Vec<PathBuf> = Vec::new();
    let mut dirs: Vec<PathBuf> = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            let guard = e.file_type().is_dir() && is_guarded(e.path(), &guarded);
            if guard {
                tracing::info!("contents of '{}' will not be cleaned up", e.path().display());
                kept.push(e.path().to_path_buf());
            }
            !guard
        });
    for entry in walker {
        let entry = entry.map_err(|e| walk_err(dir, e))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        } else {
            std::fs::remove_file(entry.path()).map_err(|e| io_err(entry.path(), e))?;
        }
    }

    for sub in dirs.iter().rev() {
        if kept.iter().any(|k| k.starts_with(sub)) {
            continue;
        }
        std::fs::remove_dir(sub).map_err(|e| io_err(sub, e))?;
    }

    if !kept.is_empty() {
        return Ok(TreeOutcome::Protected);
    }
    if delete_root {
        std::fs::remove_dir(dir).map_err(|e| io_err(dir, e))?;
    }
    Ok(TreeOutcome::Done)
}

fn is_guarded(dir: &Path, guarded: &[PathBuf]) -> bool {
    dir.canonicalize()
        .map(|canonical| guarded.iter().any(|g| *g == canonical))
        .unwrap_or(false)
}

fn walk_err(root: &Path, err: walkdir::Error) -> SyncError {
    let path = err.path().unwrap_or(root).to_path_buf();
    io_err(path, err.into())
}
