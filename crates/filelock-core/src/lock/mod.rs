//! File locking module for process-level mutual exclusion
//!
//! This module provides whole-file advisory locks: POSIX record locks
//! (`fcntl`) on Unix and byte-range locks (`LockFileEx` on an overlapped
//! handle) on Windows. A [`Locker`] owns the registry of paths this process
//! already holds, its configuration, and the interrupt source polled while
//! waiting.
//!
//! Outcomes of [`Locker::lock`]:
//!
//! - `Ok(Some(handle))`: the lock is held
//! - `Ok(None)`: held elsewhere and the timeout ran out (not an error)
//! - `Err(LockError::Interrupted { .. })`: the interrupt source fired
//! - any other `Err`: fatal; the lock file has already been closed
//!
//! # One locker per path
//!
//! Record locks are owned by the process, not by a descriptor, so a path
//! may be open in only one locker at a time. A second locker asking for a
//! path the first is acquiring or holding gets
//! [`LockError::HeldByOtherLocker`] and never touches the file. Use a
//! single locker per process (behind a `Mutex` if threads share it) to get
//! deduplication instead of that error.

use crate::config::LockConfig;
use log::debug;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

mod acquire;
mod claims;
mod error;
mod handle;
mod interrupt;
mod registry;
mod sys;
mod timeout;

pub use error::LockError;
pub use handle::LockHandle;
pub use interrupt::{Interrupt, InterruptFlag, NeverInterrupt};
pub use registry::Registry;
pub use sys::RawDescriptor;
pub use timeout::{LockRequest, ParseTimeoutError, TimeoutSpec};

use claims::KeyClaim;
use handle::LockedFile;


/// Acquires and releases file locks for one process.
///
/// Mutating operations take `&mut self`, so calls into one locker are
/// serialized. Share a locker between threads by wrapping it in a `Mutex`.
///
/// Deduplication is per locker. Paths are claimed process-wide: while one
/// locker is acquiring or holding a path, every other locker in the process
/// is refused that path with [`LockError::HeldByOtherLocker`].
pub struct Locker {
    registry: Registry,
    config: LockConfig,
    interrupt: Arc<dyn Interrupt>,
}

impl Locker {
    /// Locker with default configuration that is never interrupted
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    pub fn with_config(config: LockConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
            interrupt: Arc::new(NeverInterrupt),
        }
    }

    /// Replaces the interrupt source polled while waiting
    pub fn with_interrupt(mut self, interrupt: impl Interrupt + 'static) -> Self {
        self.interrupt = Arc::new(interrupt);
        self
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Acquires a lock on `path`.
    ///
    /// The file is created if absent (owner read/write on Unix). Its content
    /// is never read or written.
    ///
    /// If this locker already holds `path`, no OS call is made: the new
    /// handle shares the existing lock. An exclusive lock serves shared
    /// requests too; an exclusive request on a path held shared fails with
    /// [`LockError::UpgradeUnsupported`].
    ///
    /// A path held or being acquired by another locker in this process is
    /// refused without opening the file, whatever the timeout.
    ///
    /// # Errors
    ///
    /// [`LockError::Interrupted`] when the interrupt source fires while
    /// waiting, [`LockError::HeldByOtherLocker`] when another locker in this
    /// process has the path, and a fatal variant when the file cannot be
    /// opened or the OS lock call fails for a reason other than contention.
    pub fn lock(
        &mut self,
        path: impl AsRef<Path>,
        exclusive: bool,
        timeout: TimeoutSpec,
    ) -> Result<Option<LockHandle>, LockError> {
        let path = path.as_ref();

        if self.config.create_dirs {
            create_parent_dirs(path)?;
        }

        let key = registry::registry_key(path);

        if let Some(held) = self.registry.shared(&key) {
            if exclusive && !held.is_exclusive() {
                return Err(LockError::UpgradeUnsupported {
                    path: path.to_path_buf(),
                });
            }
            debug!("'{}' already locked by this locker, sharing", path.display());
            return Ok(Some(LockHandle::new(held, path.to_path_buf(), key)));
        }

        let Some(claim) = KeyClaim::take(&key) else {
            return Err(LockError::HeldByOtherLocker {
                path: path.to_path_buf(),
            });
        };

        // On every early return below the file is closed before the claim drops
        let file = match acquire::acquire(
            path,
            exclusive,
            timeout,
            &self.config,
            self.interrupt.as_ref(),
        )? {
            Some(file) => file,
            None => {
                debug!("lock on '{}' not acquired ({})", path.display(), timeout);
                return Ok(None);
            }
        };

        let locked = Arc::new(LockedFile::new(file, path.to_path_buf(), exclusive, claim));
        if self.registry.insert(key.clone(), &locked).is_err() {
            // Unlocks and closes before the error surfaces
            drop(locked);
            return Err(LockError::OutOfMemory {
                path: path.to_path_buf(),
            });
        }

        debug!(
            "locked '{}' ({})",
            path.display(),
            if exclusive { "exclusive" } else { "shared" }
        );
        Ok(Some(LockHandle::new(locked, path.to_path_buf(), key)))
    }

    /// Same as [`Locker::lock`] for a request value
    pub fn lock_request(&mut self, request: &LockRequest) -> Result<Option<LockHandle>, LockError> {
        self.lock(&request.path, request.exclusive, request.timeout)
    }

    /// Releases `handle`. Always succeeds; releasing twice is a no-op.
    ///
    /// The OS lock is released when the last handle sharing it is released.
    pub fn unlock(&mut self, handle: &mut LockHandle) {
        let Some(file) = handle.take() else {
            return;
        };

        if Arc::strong_count(&file) == 1 {
            self.registry.remove_if_same(handle.key(), &file);
            debug!("unlocked '{}'", handle.path().display());
        }
        // Last share: unlocks and closes here
        drop(file);
    }

    /// True if `handle` was released or this locker no longer holds its lock
    pub fn is_unlocked(&self, handle: &LockHandle) -> bool {
        match handle.file() {
            None => true,
            Some(file) => !self.registry.holds(handle.key(), file),
        }
    }
}

impl Default for Locker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Locker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locker")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn create_parent_dirs(path: &Path) -> Result<(), LockError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| LockError::Open {
                path: path.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}
