//! Two-lane artifact queue backed by a directory.
//!
//! ```text
//! <queue_dir>/
//!   <prefix><id>           pending lane
//!   failed-<prefix><id>    failed lane
//! ```
//!
//! The file name is the only state. All knowledge of the convention lives
//! here; callers move artifacts with [`RetryQueue::mark_applied`],
//! [`RetryQueue::mark_failed`] and [`RetryQueue::discard`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use hooksync_core::types::FAILED_MARKER;

use crate::error::{io_err, SyncError};

/// Which half of the queue an artifact sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Pending,
    Failed,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Pending => write!(f, "pending"),
            Lane::Failed => write!(f, "failed"),
        }
    }
}

/// A queued change-set file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub file_name: String,
    pub path: PathBuf,
    pub lane: Lane,
}

/// Queue directory plus the naming convention for its two lanes.
#[derive(Debug, Clone)]
pub struct RetryQueue {
    dir: PathBuf,
    prefix: String,
}

impl RetryQueue {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Which lane `file_name` belongs to, if any.
    pub fn classify(&self, file_name: &str) -> Option<Lane> {
        if let Some(rest) = file_name.strip_prefix(FAILED_MARKER) {
            return rest.starts_with(&self.prefix).then_some(Lane::Failed);
        }
        file_name.starts_with(&self.prefix).then_some(Lane::Pending)
    }

    /// Regular files of `lane`, sorted by file name.
    ///
    /// A missing queue directory is an empty queue.
    pub fn list(&self, lane: Lane) -> Result<Vec<Artifact>, SyncError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut artifacts: Vec<Artifact> = std::fs::read_dir(&self.dir)
            .map_err(|e| io_err(&self.dir, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| {
                let file_name = e.file_name().to_str()?.to_string();
                (self.classify(&file_name)? == lane).then(|| Artifact {
                    path: e.path(),
                    file_name,
                    lane,
                })
            })
            .collect();
        artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(artifacts)
    }

    pub fn list_pending(&self) -> Result<Vec<Artifact>, SyncError> {
        self.list(Lane::Pending)
    }

    pub fn list_failed(&self) -> Result<Vec<Artifact>, SyncError> {
        self.list(Lane::Failed)
    }

    /// Raw payload bytes of `artifact`.
    pub fn read(&self, artifact: &Artifact) -> Result<Vec<u8>, SyncError> {
        std::fs::read(&artifact.path).map_err(|e| io_err(&artifact.path, e))
    }

    /// Processing succeeded: the artifact leaves the queue.
    pub fn mark_applied(&self, artifact: &Artifact) -> Result<(), SyncError> {
        std::fs::remove_file(&artifact.path).map_err(|e| io_err(&artifact.path, e))
    }

    /// Processing failed: pending artifacts move to the failed lane; failed
    /// artifacts stay as they are. Returns the artifact's current location.
    ///
    /// An older failed artifact with the same name is never replaced; the
    /// newcomer gets a `.<n>` suffix instead.
    pub fn mark_failed(&self, artifact: &Artifact) -> Result<Artifact, SyncError> {
        match artifact.lane {
            Lane::Failed => Ok(artifact.clone()),
            Lane::Pending => {
                let (file_name, path) = self.free_failed_name(&artifact.file_name);
                std::fs::rename(&artifact.path, &path).map_err(|e| io_err(&path, e))?;
                Ok(Artifact {
                    file_name,
                    path,
                    lane: Lane::Failed,
                })
            }
        }
    }

    fn free_failed_name(&self, pending_name: &str) -> (String, PathBuf) {
        let base = format!("{FAILED_MARKER}{pending_name}");
        let mut file_name = base.clone();
        let mut n = 1;
        loop {
            let path = self.dir.join(&file_name);
            if std::fs::symlink_metadata(&path).is_err() {
                return (file_name, path);
            }
            file_name = format!("{base}.{n}");
            n += 1;
        }
    }

    /// Drop an artifact without processing it.
    pub fn discard(&self, artifact: &Artifact) -> Result<(), SyncError> {
        std::fs::remove_file(&artifact.path).map_err(|e| io_err(&artifact.path, e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn names(artifacts: &[Artifact]) -> Vec<&str> {
        artifacts.iter().map(|a| a.file_name.as_str()).collect()
    }

    fn seeded() -> (TempDir, RetryQueue) {
        let dir = TempDir::new().unwrap();
        for name in [
            "commit-2",
            "commit-1",
            "failed-commit-0",
            "unrelated.txt",
            "failed-other",
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("commit-dir")).unwrap();
        let queue = RetryQueue::new(dir.path(), "commit-");
        (dir, queue)
    }

    #[rstest]
    #[case("commit-1", Some(Lane::Pending))]
    #[case("failed-commit-1", Some(Lane::Failed))]
    #[case("failed-failed-commit-1", None)]
    #[case("failed-other", None)]
    #[case("other", None)]
    fn classify_by_file_name(#[case] name: &str, #[case] lane: Option<Lane>) {
        let queue = RetryQueue::new("/unused", "commit-");
        assert_eq!(queue.classify(name), lane);
    }

    #[test]
    fn pending_scan_never_sees_failed_artifacts() {
        let (_dir, queue) = seeded();
        let pending = queue.list_pending().unwrap();
        assert_eq!(names(&pending), vec!["commit-1", "commit-2"]);
        assert!(pending.iter().all(|a| a.lane == Lane::Pending));
    }

    #[test]
    fn failed_scan_never_sees_pending_artifacts() {
        let (_dir, queue) = seeded();
        let failed = queue.list_failed().unwrap();
        assert_eq!(names(&failed), vec!["failed-commit-0"]);
    }

    #[test]
    fn missing_queue_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let queue = RetryQueue::new(dir.path().join("absent"), "commit-");
        assert!(queue.list_pending().unwrap().is_empty());
    }

    #[test]
    fn mark_failed_moves_pending_to_failed_lane() {
        let (_dir, queue) = seeded();
        let artifact = queue.list_pending().unwrap().remove(0);
        let moved = queue.mark_failed(&artifact).unwrap();

        assert_eq!(moved.file_name, "failed-commit-1");
        assert_eq!(moved.lane, Lane::Failed);
        assert!(!artifact.path.exists());
        assert!(moved.path.exists());
        assert_eq!(names(&queue.list_failed().unwrap()), vec!["failed-commit-0", "failed-commit-1"]);
    }

    #[test]
    fn mark_failed_never_replaces_an_older_failure() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("failed-push-1"), "older").unwrap();
        fs::write(tmp.path().join("failed-push-1.1"), "middle").unwrap();
        fs::write(tmp.path().join("push-1"), "newer").unwrap();
        let queue = RetryQueue::new(tmp.path(), "push-");

        let pending = queue.list_pending().unwrap();
        let moved = queue.mark_failed(&pending[0]).unwrap();

        assert_eq!(moved.file_name, "failed-push-1.2");
        assert_eq!(queue.classify(&moved.file_name), Some(Lane::Failed));
        assert_eq!(fs::read_to_string(tmp.path().join("failed-push-1")).unwrap(), "older");
        assert_eq!(fs::read_to_string(tmp.path().join("failed-push-1.1")).unwrap(), "middle");
        assert_eq!(fs::read_to_string(&moved.path).unwrap(), "newer");
        assert!(!tmp.path().join("push-1").exists());
    }

    #[test]
    fn mark_failed_leaves_failed_artifact_untouched() {
        let (_dir, queue) = seeded();
        let artifact = queue.list_failed().unwrap().remove(0);
        let same = queue.mark_failed(&artifact).unwrap();
        assert_eq!(same, artifact);
        assert!(artifact.path.exists());
    }

    #[test]
    fn mark_applied_deletes_artifact() {
        let (_dir, queue) = seeded();
        let artifact = queue.list_failed().unwrap().remove(0);
        queue.mark_applied(&artifact).unwrap();
        assert!(!artifact.path.exists());
        assert!(queue.list_failed().unwrap().is_empty());
    }

    #[test]
    fn read_returns_payload_bytes() {
        let (_dir, queue) = seeded();
        let artifact = queue.list_pending().unwrap().remove(0);
        assert_eq!(queue.read(&artifact).unwrap(), b"{}");
    }
}
