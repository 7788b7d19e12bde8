//! Best-effort removal of directories emptied by deletes.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Try to remove every collected directory; returns how many were removed.
///
/// Walks in reverse path order so `a/b` is tried before `a`. Anything that
/// fails (not empty, already gone, permission) is skipped.
pub fn reap(dirs: &BTreeMap<PathBuf, String>) -> usize {
    let mut removed = 0;
    for (dir, name) in dirs.iter().rev() {
        match std::fs::remove_dir(dir) {
            Ok(()) => {
                tracing::info!("removed empty directory {name}");
                removed += 1;
            }
            Err(e) => tracing::debug!("kept directory {name}: {e}"),
        }
    }
    removed
}
