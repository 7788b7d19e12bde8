//! Domain types for hooksync configuration.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Filename marker prepended to artifacts whose processing failed.
pub const FAILED_MARKER: &str = "failed-";

pub const DEFAULT_RAW_HOST: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_ARCHIVE_HOST: &str = "https://github.com";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Short repository name, as found in `repository.name` of a push payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoName(pub String);

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Branch name a destination tracks (e.g. `main`, `release`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What the engine does with an artifact pushed to a branch nobody deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Delete the artifact from the queue.
    #[default]
    Discard,
    /// Leave the artifact where it is.
    Keep,
}

impl fmt::Display for MismatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchPolicy::Discard => write!(f, "discard"),
            MismatchPolicy::Keep => write!(f, "keep"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config document
// ---------------------------------------------------------------------------

/// HTTP basic auth pair used for remote fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Per-repository deploy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Local directory the repository tree is mirrored into.
    pub destination: PathBuf,
    /// Overrides [`Config::default_branch`] for this repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchName>,
}

/// Resolved destination + branch for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub repository: RepoName,
    pub destination: PathBuf,
    pub branch: BranchName,
}

/// Root of the hooksync YAML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding queued change-set artifacts.
    pub queue_dir: PathBuf,
    /// Prefix every pending artifact file name starts with.
    pub filename_prefix: String,
    pub default_branch: BranchName,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub on_branch_mismatch: MismatchPolicy,
    #[serde(default = "default_raw_host")]
    pub raw_host: String,
    #[serde(default = "default_archive_host")]
    pub archive_host: String,
    /// Owner used to build archive URLs for bootstrap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_owner: Option<String>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub repositories: BTreeMap<RepoName, RepositoryConfig>,
}

fn default_raw_host() -> String {
    DEFAULT_RAW_HOST.to_string()
}

fn default_archive_host() -> String {
    DEFAULT_ARCHIVE_HOST.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Config {
    /// Minimal config with no repositories; the rest takes defaults.
    pub fn new(queue_dir: PathBuf, filename_prefix: impl Into<String>) -> Self {
        Self {
            queue_dir,
            filename_prefix: filename_prefix.into(),
            default_branch: BranchName::from("master"),
            verbose: false,
            on_branch_mismatch: MismatchPolicy::default(),
            raw_host: default_raw_host(),
            archive_host: default_archive_host(),
            repo_owner: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            credentials: None,
            repositories: BTreeMap::new(),
        }
    }

    /// Look up where `repository` deploys to and which branch it tracks.
    ///
    /// Returns [`ConfigError::UnknownRepository`] when the repository has no entry.
    pub fn deploy_target(&self, repository: &str) -> Result<DeployTarget, ConfigError> {
        let name = RepoName::from(repository);
        let entry = self
            .repositories
            .get(&name)
            .ok_or_else(|| ConfigError::UnknownRepository {
                name: repository.to_string(),
            })?;
        Ok(DeployTarget {
            branch: entry
                .branch
                .clone()
                .unwrap_or_else(|| self.default_branch.clone()),
            destination: entry.destination.clone(),
            repository: name,
        })
    }

    /// Check the semantic rules serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_branch.0.trim().is_empty() {
            return Err(ConfigError::Invalid("default_branch must not be empty".into()));
        }
        if self.filename_prefix.is_empty() {
            return Err(ConfigError::Invalid("filename_prefix must not be empty".into()));
        }
        if self.filename_prefix.starts_with(FAILED_MARKER) {
            return Err(ConfigError::Invalid(format!(
                "filename_prefix must not start with the '{FAILED_MARKER}' marker"
            )));
        }
        for (name, repo) in &self.repositories {
            if repo.destination.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "repository '{name}' has an empty destination"
                )));
            }
            if let Some(branch) = &repo.branch {
                if branch.0.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "repository '{name}' has an empty branch override"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut cfg = Config::new(PathBuf::from("/var/spool/hooksync"), "commit-");
        cfg.repositories.insert(
            RepoName::from("site"),
            RepositoryConfig {
                destination: PathBuf::from("/srv/www/site"),
                branch: Some(BranchName::from("main")),
            },
        );
        cfg.repositories.insert(
            RepoName::from("docs"),
            RepositoryConfig {
                destination: PathBuf::from("/srv/www/docs"),
                branch: None,
            },
        );
        cfg
    }

    #[test]
    fn newtype_display() {
        assert_eq!(RepoName::from("site").to_string(), "site");
        assert_eq!(BranchName::from("main").to_string(), "main");
    }

    #[test]
    fn deploy_target_uses_branch_override() {
        let target = sample().deploy_target("site").expect("target");
        assert_eq!(target.branch, BranchName::from("main"));
        assert_eq!(target.destination, PathBuf::from("/srv/www/site"));
    }

    #[test]
    fn deploy_target_falls_back_to_default_branch() {
        let target = sample().deploy_target("docs").expect("target");
        assert_eq!(target.branch, BranchName::from("master"));
    }

    #[test]
    fn unknown_repository_is_rejected() {
        let err = sample().deploy_target("nope").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRepository { ref name } if name == "nope"));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn prefix_carrying_failed_marker_is_invalid() {
        let mut cfg = sample();
        cfg.filename_prefix = "failed-commit-".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn mismatch_policy_defaults_to_discard() {
        assert_eq!(MismatchPolicy::default(), MismatchPolicy::Discard);
        assert_eq!(MismatchPolicy::Keep.to_string(), "keep");
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = sample();
        let yaml = serde_yaml::to_string(&cfg).expect("serialize");
        let back: Config = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, cfg);
    }
}
