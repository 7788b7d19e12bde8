//! hooksync core library: configuration types, config persistence, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, deploy targets and the [`Config`] document
//! - [`error`]: [`ConfigError`]
//! - [`config`]: load / save / default path

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{
    BranchName, Config, Credentials, DeployTarget, MismatchPolicy, RepoName, RepositoryConfig,
};
