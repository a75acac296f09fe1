//! Lock configuration loaded from `filelock.toml`
//!
//! Every key is optional; a missing file section falls back to the defaults
//! in [`consts`].

pub mod consts;
mod error;
mod model;

pub use error::ConfigError;
pub use model::{Config, LockConfig};
