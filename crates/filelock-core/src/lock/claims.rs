//! Process-wide claims on lock keys
//!
//! Record locks belong to the process. If two lockers opened the same file,
//! closing either descriptor would drop the lock the other still reports as
//! held. Each locker therefore claims a key here before opening it, and a
//! key claimed by one locker is refused to every other locker until the
//! claim is dropped.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

static CLAIMED: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

fn claimed() -> MutexGuard<'static, BTreeSet<PathBuf>> {
    // The set is never left half-updated, so a poisoned guard is still valid
    CLAIMED.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive right of one locker to open `key` in this process.
///
/// Held while the lock is being acquired, then moved into the locked file so
/// it is dropped only after the descriptor has been closed.
#[derive(Debug)]
pub(crate) struct KeyClaim {
    key: PathBuf,
}

impl KeyClaim {
    /// Claims `key`, or returns `None` if another locker already has it
    pub(crate) fn take(key: &Path) -> Option<Self> {
        if claimed().insert(key.to_path_buf()) {
            Some(Self {
                key: key.to_path_buf(),
            })
        } else {
            None
        }
    }
}

impl Drop for KeyClaim {
    fn drop(&mut self) {
        claimed().remove(&self.key);
    }
}

/// Whether any locker in this process currently claims `key`
#[cfg(test)]
pub(crate) fn is_claimed(key: &Path) -> bool {
    claimed().contains(key)
}
