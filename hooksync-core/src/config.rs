//! YAML configuration file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.hooksync/
//!   config.yaml      (mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function touching the default location has two forms:
//! - `fn_at(path: &Path, …)`: explicit path; used in tests with `TempDir`
//! - `fn(…)`: derives the path from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::Config;

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.hooksync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".hooksync").join("config.yaml")
}

/// `~/.hooksync/config.yaml` (convenience: uses `dirs::home_dir()`).
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML,
/// `ConfigError::Invalid` if a semantic rule is violated.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper for the default location.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&default_config_path()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The config may carry credentials, hence the restrictive mode.
pub fn save_at(path: &Path, config: &Config) -> Result<(), ConfigError> {
    config.validate()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// `save_at` convenience wrapper for the default location.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    save_at(&default_config_path()?, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchName, MismatchPolicy};
    use tempfile::TempDir;

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        let path = config_path_at(home.path());
        assert!(path.ends_with(".hooksync/config.yaml"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let home = TempDir::new().expect("tempdir");
        let path = config_path_at(home.path());
        let mut cfg = Config::new(home.path().join("queue"), "commit-");
        cfg.default_branch = BranchName::from("main");
        cfg.on_branch_mismatch = MismatchPolicy::Keep;

        save_at(&path, &cfg).expect("save");
        let loaded = load_at(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn save_cleans_up_tmp() {
        let home = TempDir::new().expect("tempdir");
        let path = config_path_at(home.path());
        let cfg = Config::new(home.path().join("queue"), "commit-");
        save_at(&path, &cfg).expect("save");
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    #[cfg(unix)]
    fn saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let home = TempDir::new().expect("tempdir");
        let path = config_path_at(home.path());
        save_at(&path, &Config::new(home.path().join("queue"), "commit-")).expect("save");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn load_missing_returns_not_found() {
        let home = TempDir::new().expect("tempdir");
        let err = load_at(&config_path_at(home.path())).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(ConfigError::HomeNotFound.to_string().contains("home directory"));
    }
}
