pub mod queue;
pub mod setup;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};
use hooksync_core::{config, Config};

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_at(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => config::load().context("failed to load config; create ~/.hooksync/config.yaml"),
    }
}
