//! Error types for file locking
//!
//! Contention is not an error: a lock held elsewhere is reported as
//! `Ok(None)` by [`Locker::lock`](super::Locker::lock). Everything here is
//! either a cancellation or a fatal failure, and in every case the lock
//! file descriptor has already been closed when the error is returned.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for lock operations
#[derive(Error, Debug)]
pub enum LockError {
    /// The lock file could not be opened or created
    #[error("LOCK_OPEN_FAILED: cannot open lock file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The OS lock call failed for a reason other than contention
    #[error("LOCK_FAILED: cannot lock file '{path}': {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The interrupt source fired while waiting
    #[error("LOCK_INTERRUPTED: waiting for lock on '{path}' was interrupted")]
    Interrupted { path: PathBuf },

    /// An exclusive lock was requested on a path this process holds shared
    #[error("LOCK_UPGRADE_UNSUPPORTED: '{path}' is already locked shared by this process")]
    UpgradeUnsupported { path: PathBuf },

    /// Another locker in this process is acquiring or holding the path
    #[error("LOCK_HELD_IN_PROCESS: '{path}' is already locked by another locker in this process")]
    HeldByOtherLocker { path: PathBuf },

    /// The registry could not grow to record the new lock
    #[error("LOCK_OUT_OF_MEMORY: cannot register lock on '{path}'")]
    OutOfMemory { path: PathBuf },
}

impl LockError {
    /// Path of the lock file the error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            LockError::Open { path, .. }
            | LockError::Lock { path, .. }
            | LockError::Interrupted { path }
            | LockError::UpgradeUnsupported { path }
            | LockError::HeldByOtherLocker { path }
            | LockError::OutOfMemory { path } => path,
        }
    }

    /// True for cancellation, false for fatal failures
    pub fn is_interrupted(&self) -> bool {
        matches!(self, LockError::Interrupted { .. })
    }
}
