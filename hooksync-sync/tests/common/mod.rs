#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use hooksync_core::{BranchName, Config, RepoName, RepositoryConfig};
use hooksync_sync::{FetchError, RemoteFetcher};
use tempfile::TempDir;

/// In-memory remote keyed by path, recording every request it serves.
#[derive(Default)]
pub struct MemoryRemote {
    files: HashMap<String, Vec<u8>>,
    pub requests: RefCell<Vec<(String, String, String)>>,
}

impl MemoryRemote {
    pub fn serving(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
                .collect(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests.borrow().iter().filter(|(_, _, p)| p == path).count()
    }
}

impl RemoteFetcher for MemoryRemote {
    fn fetch(&self, repository: &str, branch: &str, path: &str) -> Result<Vec<u8>, FetchError> {
        self.requests
            .borrow_mut()
            .push((repository.to_string(), branch.to_string(), path.to_string()));
        self.files.get(path).cloned().ok_or(FetchError::NotFound)
    }
}

/// A queue directory and a deploy root under one temp dir.
pub struct Harness {
    _tmp: TempDir,
    pub queue: PathBuf,
    pub dest: PathBuf,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let tmp = TempDir::new().expect("tempdir");
        let queue = tmp.path().join("queue");
        let dest = tmp.path().join("www");
        fs::create_dir_all(&queue).expect("create queue");

        let mut config = Config::new(queue.clone(), "push-");
        config.repositories.insert(
            RepoName::from("site"),
            RepositoryConfig {
                destination: dest.clone(),
                branch: Some(BranchName::from("main")),
            },
        );
        Self {
            _tmp: tmp,
            queue,
            dest,
            config,
        }
    }

    pub fn enqueue(&self, name: &str, body: &str) {
        fs::write(self.queue.join(name), body).expect("write artifact");
    }

    pub fn seed(&self, relative: &str, body: &str) {
        let path = self.dest.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        fs::write(path, body).expect("seed file");
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.dest.join(relative)).ok()
    }

    pub fn queued(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.queue)
            .expect("read queue")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn exists(&self, relative: &str) -> bool {
        Path::new(&self.dest).join(relative).exists()
    }
}

/// Build a push payload for `acme/site` on `git_ref`.
/// Each commit is `(added, removed, modified)`.
pub fn payload(git_ref: &str, commits: &[(&[&str], &[&str], &[&str])]) -> String {
    let commits: Vec<serde_json::Value> = commits
        .iter()
        .enumerate()
        .map(|(i, (added, removed, modified))| {
            serde_json::json!({
                "message": format!("commit {i}"),
                "added": added,
                "removed": removed,
                "modified": modified,
            })
        })
        .collect();
    serde_json::json!({
        "ref": git_ref,
        "repository": { "name": "site", "full_name": "acme/site" },
        "commits": commits,
    })
    .to_string()
}
