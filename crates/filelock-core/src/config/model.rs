use super::consts;
use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// filelock.toml schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lock: LockConfig,
}

/// `[lock]` table: how acquisitions wait and how lock files are created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub interrupt_interval_ms: u64,
    pub poll_initial_ms: u64,
    pub poll_max_ms: u64,
    pub wait_notice_ms: u64,
    pub file_mode: u32,
    pub create_dirs: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            interrupt_interval_ms: consts::wait::INTERRUPT_INTERVAL_MS,
            poll_initial_ms: consts::wait::POLL_INITIAL_MS,
            poll_max_ms: consts::wait::POLL_MAX_MS,
            wait_notice_ms: consts::wait::WAIT_NOTICE_MS,
            file_mode: consts::file::MODE,
            create_dirs: false,
        }
    }
}

impl LockConfig {
    pub fn interrupt_interval(&self) -> Duration {
        Duration::from_millis(self.interrupt_interval_ms)
    }

    pub fn poll_initial(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms)
    }

    pub fn wait_notice(&self) -> Duration {
        Duration::from_millis(self.wait_notice_ms)
    }

    /// Checks value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interrupt_interval_ms == 0 {
            return Err(invalid("lock.interrupt_interval_ms", "must be greater than 0"));
        }
        if self.poll_initial_ms == 0 {
            return Err(invalid("lock.poll_initial_ms", "must be greater than 0"));
        }
        if self.poll_initial_ms > self.poll_max_ms {
            return Err(invalid(
                "lock.poll_initial_ms",
                "must not exceed lock.poll_max_ms",
            ));
        }
        if self.file_mode > consts::file::MAX_MODE {
            return Err(invalid("lock.file_mode", "must be at most 0o777"));
        }
        Ok(())
    }
}

impl Config {
    /// Parses and validates a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.lock.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
