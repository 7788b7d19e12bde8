//! Full bootstrap: download the branch archive and copy it over the destination.
//!
//! Used once to seed a destination before change-sets keep it current. No
//! reconciliation happens here; files absent from the archive are only
//! removed when `clean` is requested.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;

use hooksync_core::{Config, ConfigError};

use crate::error::{io_err, SyncError};
use crate::fetch::ArchiveSource;
use crate::tree::{copy_tree, delete_tree, TreeOutcome};

/// What to bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    /// Short repository name, as configured under `repositories`.
    pub repository: String,
    /// Overrides the configured `repo_owner`.
    pub owner: Option<String>,
    /// Empty the destination before copying.
    pub clean: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub repository: String,
    pub destination: PathBuf,
    pub branch: String,
    pub archive_bytes: u64,
    pub files_copied: usize,
    pub cleaned: bool,
}

/// Directories `clean` must never empty: the working directory and the queue.
pub fn protected_paths(config: &Config) -> Vec<PathBuf> {
    let mut paths = vec![config.queue_dir.clone()];
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }
    paths
}

pub fn bootstrap(
    config: &Config,
    source: &dyn ArchiveSource,
    request: &BootstrapRequest,
) -> Result<BootstrapReport, SyncError> {
    let target = config.deploy_target(&request.repository)?;
    let owner = request
        .owner
        .as_deref()
        .or(config.repo_owner.as_deref())
        .ok_or_else(|| {
            SyncError::Config(ConfigError::Invalid(
                "no repository owner: set repo_owner or pass --owner".into(),
            ))
        })?;

    let work = tempfile::Builder::new()
        .prefix("hooksync-full-")
        .tempdir()
        .map_err(|e| io_err(std::env::temp_dir(), e))?;
    let archive_path = work.path().join("archive.zip");
    let archive_bytes = {
        let mut file = File::create(&archive_path).map_err(|e| io_err(&archive_path, e))?;
        source
            .download_archive(owner, &request.repository, target.branch.as_str(), &mut file)
            .map_err(|e| SyncError::Archive(format!("download failed: {e}")))?
    };

    let extract_dir = work.path().join("extracted");
    tracing::info!("extracting archive to {}", extract_dir.display());
    let tree_root = extract(&archive_path, &extract_dir)?;

    let mut cleaned = false;
    if request.clean {
        tracing::info!("deleting old content from {}", target.destination.display());
        match delete_tree(&target.destination, false, &protected_paths(config)) {
            Ok(TreeOutcome::Done) => cleaned = true,
            Ok(TreeOutcome::Missing) => {}
            Ok(TreeOutcome::Protected) => tracing::warn!(
                "{} holds a protected directory; old content partially kept",
                target.destination.display()
            ),
            Err(e) => tracing::warn!(
                "unable to completely remove the old files from {}: {e}; continuing",
                target.destination.display()
            ),
        }
    }

    tracing::info!("copying new content to {}", target.destination.display());
    let files_copied = copy_tree(&tree_root, &target.destination)?;

    Ok(BootstrapReport {
        repository: request.repository.clone(),
        destination: target.destination,
        branch: target.branch.0,
        archive_bytes,
        files_copied,
        cleaned,
    })
}

/// Unpack a zip archive into `into` and return the directory holding the tree.
///
/// Branch archives wrap everything in one `<repo>-<branch>/` folder; that
/// folder is returned when it is the only directory present.
fn extract(archive: &Path, into: &Path) -> Result<PathBuf, SyncError> {
    let file = File::open(archive).map_err(|e| io_err(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| SyncError::Archive(format!("unable to open archive: {e}")))?;
    std::fs::create_dir_all(into).map_err(|e| io_err(into, e))?;
    zip.extract(into)
        .map_err(|e| SyncError::Archive(format!("unable to extract files: {e}")))?;

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(into)
        .map_err(|e| io_err(into, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    match dirs.len() {
        0 => Err(SyncError::Archive(format!(
            "unable to find the extracted files in {}",
            into.display()
        ))),
        1 => Ok(dirs.remove(0)),
        _ => Ok(into.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use hooksync_core::{BranchName, RepoName, RepositoryConfig};
    use std::fs;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    struct FixedArchive(Vec<u8>);

    impl ArchiveSource for FixedArchive {
        fn download_archive(
            &self,
            _owner: &str,
            _repository: &str,
            _branch: &str,
            out: &mut dyn Write,
        ) -> Result<u64, FetchError> {
            out.write_all(&self.0)?;
            Ok(self.0.len() as u64)
        }
    }

    fn zipball(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (path, body) in entries {
            writer.start_file(*path, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn config(dest: &Path, queue: &Path) -> Config {
        let mut cfg = Config::new(queue.to_path_buf(), "push-");
        cfg.repo_owner = Some("acme".into());
        cfg.repositories.insert(
            RepoName::from("site"),
            RepositoryConfig {
                destination: dest.to_path_buf(),
                branch: Some(BranchName::from("main")),
            },
        );
        cfg
    }

    fn request(clean: bool) -> BootstrapRequest {
        BootstrapRequest {
            repository: "site".into(),
            owner: None,
            clean,
        }
    }

    #[test]
    fn copies_archive_contents_without_wrapper_folder() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("www");
        let cfg = config(&dest, &tmp.path().join("q"));
        let archive = FixedArchive(zipball(&[
            ("site-main/index.html", "<html>"),
            ("site-main/css/site.css", "body{}"),
        ]));

        let report = bootstrap(&cfg, &archive, &request(false)).unwrap();
        assert_eq!(report.files_copied, 2);
        assert_eq!(report.branch, "main");
        assert_eq!(fs::read_to_string(dest.join("index.html")).unwrap(), "<html>");
        assert!(dest.join("css").join("site.css").exists());
        assert!(!dest.join("site-main").exists());
    }

    #[test]
    fn clean_removes_stale_files_first() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("www");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), "old").unwrap();
        let cfg = config(&dest, &tmp.path().join("q"));
        let archive = FixedArchive(zipball(&[("site-main/index.html", "<html>")]));

        let report = bootstrap(&cfg, &archive, &request(true)).unwrap();
        assert!(report.cleaned);
        assert!(!dest.join("stale.txt").exists());
        assert!(dest.join("index.html").exists());
    }

    #[test]
    fn without_clean_stale_files_survive() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("www");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), "old").unwrap();
        let cfg = config(&dest, &tmp.path().join("q"));
        let archive = FixedArchive(zipball(&[("site-main/index.html", "<html>")]));

        bootstrap(&cfg, &archive, &request(false)).unwrap();
        assert!(dest.join("stale.txt").exists());
    }

    #[test]
    fn unknown_repository_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp.path().join("www"), &tmp.path().join("q"));
        let archive = FixedArchive(Vec::new());
        let mut req = request(false);
        req.repository = "blog".into();
        let err = bootstrap(&cfg, &archive, &req).unwrap_err();
        assert!(matches!(err, SyncError::UnknownRepository { .. }));
    }

    #[test]
    fn missing_owner_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp.path().join("www"), &tmp.path().join("q"));
        cfg.repo_owner = None;
        let err = bootstrap(&cfg, &FixedArchive(Vec::new()), &request(false)).unwrap_err();
        assert!(matches!(err, SyncError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn corrupt_archive_is_reported() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("www");
        let cfg = config(&dest, &tmp.path().join("q"));
        let archive = FixedArchive(b"definitely not a zip file".to_vec());
        let err = bootstrap(&cfg, &archive, &request(false)).unwrap_err();
        assert!(matches!(err, SyncError::Archive(_)), "got: {err}");
        assert!(!dest.exists());
    }
}
