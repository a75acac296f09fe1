//! Per-locker table of paths this process already holds
//!
//! A second acquisition of a held path must not reach the OS again: on
//! POSIX a second descriptor locks without conflict and closing it would
//! drop the first lock, on Windows the second request would conflict with
//! ourselves. The registry maps each path to the file already locked for
//! it so the locker can hand out another handle instead.
//!
//! Entries hold weak references. The handles own the locked file; when the
//! last one goes away the entry is stale and treated as absent.

use super::handle::LockedFile;
use super::sys::RawDescriptor;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, TryReserveError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// Path → locked file held by this process
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<PathBuf, Weak<LockedFile>>,
}

/// Registry key for `path`.
///
/// The parent directory is canonicalized so different spellings of the same
/// location (`a.lock`, `./a.lock`, a symlinked directory) share one entry.
/// The file itself may not exist yet and is taken as given. When the parent
/// cannot be resolved the path is used as given; opening it will fail anyway.
pub(crate) fn registry_key(path: &Path) -> PathBuf {
    let Some(file_name) = path.file_name() else {
        return path.to_path_buf();
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    match parent.canonicalize() {
        Ok(dir) => dir.join(file_name),
        Err(_) => path.to_path_buf(),
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor held for `path`, if this process holds it
    pub fn find(&self, path: &Path) -> Option<RawDescriptor> {
        self.live(&registry_key(path)).map(|f| f.descriptor())
    }

    /// Whether this process holds a lock on `path`
    pub fn contains(&self, path: &Path) -> bool {
        self.live(&registry_key(path)).is_some()
    }

    /// Number of paths currently held
    pub fn len(&self) -> usize {
        self.entries.values().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the paths currently held, in no particular order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|(_, w)| w.strong_count() > 0)
            .map(|(k, _)| k.as_path())
    }

    fn live(&self, key: &Path) -> Option<Arc<LockedFile>> {
        self.entries.get(key).and_then(Weak::upgrade)
    }

    /// Locked file for `key`, dropping the entry if it went stale
    pub(crate) fn shared(&mut self, key: &Path) -> Option<Arc<LockedFile>> {
        let file = self.live(key);
        if file.is_none() {
            self.remove(key);
        }
        file
    }

    /// Records `file` as the lock held for `key`.
    ///
    /// Entries whose handles were all dropped are pruned first. Fails only
    /// when the table cannot grow.
    pub(crate) fn insert(
        &mut self,
        key: PathBuf,
        file: &Arc<LockedFile>,
    ) -> Result<(), TryReserveError> {
        self.entries.retain(|_, w| w.strong_count() > 0);
        self.entries.try_reserve(1)?;
        self.entries.insert(key, Arc::downgrade(file));
        Ok(())
    }

    /// Removes the entry for `key` if present
    pub(crate) fn remove(&mut self, key: &Path) {
        self.entries.remove(key);
    }

    /// Removes the entry for `key` only if it refers to `file`
    pub(crate) fn remove_if_same(&mut self, key: &Path, file: &Arc<LockedFile>) {
        if let Entry::Occupied(entry) = self.entries.entry(key.to_path_buf()) {
            if same_file(entry.get(), file) {
                entry.remove();
            }
        }
    }

    /// Whether the entry for `key` still refers to `file`
    pub(crate) fn holds(&self, key: &Path, file: &Arc<LockedFile>) -> bool {
        self.entries.get(key).is_some_and(|w| same_file(w, file))
    }
}

#[cfg(test)]
impl Registry {
    /// Entries stored, including stale ones not yet pruned
    pub(crate) fn stored(&self) -> usize {
        self.entries.len()
    }
}

fn same_file(weak: &Weak<LockedFile>, file: &Arc<LockedFile>) -> bool {
    std::ptr::eq(weak.as_ptr(), Arc::as_ptr(file))
}
