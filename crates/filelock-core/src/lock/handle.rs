//! Lock handles and the locked files they share

use super::claims::KeyClaim;
use super::sys::{self, RawDescriptor};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An open lock file whose OS lock is currently held.
///
/// Dropping it unlocks (best-effort) and closes the descriptor. Handles for
/// the same path within one locker share a single `LockedFile`.
#[derive(Debug)]
pub(crate) struct LockedFile {
    file: File,
    path: PathBuf,
    exclusive: bool,
    // Declared after `file`: released only once the descriptor is closed
    _claim: KeyClaim,
}

impl LockedFile {
    pub(crate) fn new(file: File, path: PathBuf, exclusive: bool, claim: KeyClaim) -> Self {
        Self {
            file,
            path,
            exclusive,
            _claim: claim,
        }
    }

    pub(crate) fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub(crate) fn descriptor(&self) -> RawDescriptor {
        sys::descriptor(&self.file)
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        // Closing releases the lock as well; unlocking first is best-effort
        if let Err(e) = sys::unlock(&self.file) {
            log::warn!(
                "failed to unlock '{}' before closing: {}",
                self.path.display(),
                e
            );
        }
        log::trace!("closing lock file '{}'", self.path.display());
    }
}

/// Result of a successful acquisition.
///
/// While a handle is not released, the lock it refers to is held by this
/// process. Release it with [`Locker::unlock`](super::Locker::unlock).
/// A handle dropped without `unlock` releases its share all the same: once
/// the last handle sharing a lock file is gone, the file is unlocked and
/// closed, and the registry forgets the path on its next lookup.
#[derive(Debug)]
pub struct LockHandle {
    file: Option<Arc<LockedFile>>,
    path: PathBuf,
    key: PathBuf,
    exclusive: bool,
}

impl LockHandle {
    pub(crate) fn new(file: Arc<LockedFile>, path: PathBuf, key: PathBuf) -> Self {
        let exclusive = file.is_exclusive();
        Self {
            file: Some(file),
            path,
            key,
            exclusive,
        }
    }

    /// Path as passed to `lock`
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode of the lock actually held.
    ///
    /// A shared request served by an exclusive lock this process already
    /// holds reports `true`.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// True once the handle has been passed to `unlock`
    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    /// Descriptor of the locked file, `None` after release
    pub fn descriptor(&self) -> Option<RawDescriptor> {
        self.file.as_ref().map(|f| f.descriptor())
    }

    pub(crate) fn key(&self) -> &Path {
        &self.key
    }

    pub(crate) fn file(&self) -> Option<&Arc<LockedFile>> {
        self.file.as_ref()
    }

    pub(crate) fn take(&mut self) -> Option<Arc<LockedFile>> {
        self.file.take()
    }
}
