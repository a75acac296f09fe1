//! Global context for CLI commands

use anyhow::{Context as _, Result};
use filelock_core::{Config, Locker};
use std::path::Path;

/// Loaded configuration and the locker built from it
pub struct Context {
    pub config: Config,
    pub locker: Locker,
    pub verbose: bool,
}

impl Context {
    /// Create a new context from an optional config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed, or
    /// validated
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        log::debug!("lock settings: {:?}", config.lock);

        let locker = Locker::with_config(config.lock.clone());

        Ok(Self {
            config,
            locker,
            verbose,
        })
    }
}
