//! CLI command implementations
//!
//! Each command returns the process exit code on success; fatal errors
//! propagate to `main` and exit 1.

pub mod check;
pub mod hold;
pub mod run;
pub mod try_lock;
