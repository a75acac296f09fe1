//! Lock acquisition: open, lock, and the sliced wait shared by both backends
//!
//! ```text
//! Idle -> Opening -> Acquired | WouldBlock | Waiting
//! Waiting -> Waiting | Acquired | TimedOut | Interrupted | Error
//! (anything but Acquired) -> Closed
//! ```

use super::interrupt::Interrupt;
use super::sys;
use super::{LockError, TimeoutSpec};
use crate::config::LockConfig;
use log::{info, trace};
use std::fs::File;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Opening,
    Waiting,
    Acquired,
    WouldBlock,
    TimedOut,
    Interrupted,
    Error,
    Closed,
}

/// Tracks one acquisition attempt through its states
struct Attempt<'a> {
    path: &'a Path,
    state: State,
}

impl<'a> Attempt<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            state: State::Idle,
        }
    }

    fn enter(&mut self, next: State) {
        trace!(
            "lock '{}': {:?} -> {:?}",
            self.path.display(),
            self.state,
            next
        );
        self.state = next;
    }

    fn lock_error(&mut self, source: std::io::Error) -> LockError {
        self.enter(State::Error);
        LockError::Lock {
            path: self.path.to_path_buf(),
            source,
        }
    }
}

/// Opens `path` and locks it according to `timeout`.
///
/// Returns the locked file, `Ok(None)` when the lock is held elsewhere and
/// the timeout ran out, or an error. The file is closed on every path that
/// does not return it.
pub(crate) fn acquire(
    path: &Path,
    exclusive: bool,
    timeout: TimeoutSpec,
    config: &LockConfig,
    interrupt: &dyn Interrupt,
) -> Result<Option<File>, LockError> {
    let mut attempt = Attempt::new(path);

    attempt.enter(State::Opening);
    let file = match sys::open(path, config) {
        Ok(file) => file,
        Err(e) => {
            attempt.enter(State::Error);
            return Err(LockError::Open {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let result = if timeout.is_immediate() {
        lock_now(&file, exclusive, &mut attempt)
    } else {
        lock_wait(&file, exclusive, timeout, config, interrupt, &mut attempt)
    };

    match result {
        Ok(true) => Ok(Some(file)),
        Ok(false) => {
            drop(file);
            attempt.enter(State::Closed);
            Ok(None)
        }
        Err(e) => {
            drop(file);
            attempt.enter(State::Closed);
            Err(e)
        }
    }
}

/// One attempt that never blocks
fn lock_now(file: &File, exclusive: bool, attempt: &mut Attempt<'_>) -> Result<bool, LockError> {
    match sys::try_lock(file, exclusive) {
        Ok(true) => {
            attempt.enter(State::Acquired);
            Ok(true)
        }
        Ok(false) => {
            attempt.enter(State::WouldBlock);
            Ok(false)
        }
        Err(e) => Err(attempt.lock_error(e)),
    }
}

/// Waits in slices of the interrupt interval, checking the interrupt
/// source and the deadline between slices
fn lock_wait(
    file: &File,
    exclusive: bool,
    timeout: TimeoutSpec,
    config: &LockConfig,
    interrupt: &dyn Interrupt,
    attempt: &mut Attempt<'_>,
) -> Result<bool, LockError> {
    let started = Instant::now();
    // A bound too large to represent waits like Infinite
    let deadline = timeout.limit().and_then(|limit| started.checked_add(limit));
    let interval = config.interrupt_interval();
    let mut notice_shown = false;

    let mut waiter = match sys::Waiter::start(file, exclusive, config) {
        Ok(waiter) => waiter,
        Err(e) => return Err(attempt.lock_error(e)),
    };
    attempt.enter(State::Waiting);

    loop {
        let slice = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    attempt.enter(State::TimedOut);
                    return Ok(false);
                }
                remaining.min(interval)
            }
            None => interval,
        };

        match waiter.wait(slice) {
            Ok(true) => {
                attempt.enter(State::Acquired);
                return Ok(true);
            }
            Ok(false) => {}
            Err(e) => return Err(attempt.lock_error(e)),
        }

        if interrupt.is_pending() {
            attempt.enter(State::Interrupted);
            return Err(LockError::Interrupted {
                path: attempt.path.to_path_buf(),
            });
        }

        if !notice_shown && started.elapsed() >= config.wait_notice() {
            info!(
                "Waiting for lock on {} ({})...",
                attempt.path.display(),
                if exclusive { "exclusive" } else { "shared" }
            );
            notice_shown = true;
        }
    }
}
