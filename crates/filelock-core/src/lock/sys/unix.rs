//! POSIX record locks (`fcntl` with `F_SETLK`)
//!
//! Record locks belong to the process, not to the descriptor: a second
//! descriptor on the same file locks without conflict, and closing any
//! descriptor of the file drops every lock the process holds on it. The
//! registry keeps one descriptor per path for that reason.

use crate::config::LockConfig;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Platform descriptor of an open lock file
pub type RawDescriptor = RawFd;

pub(crate) fn descriptor(file: &File) -> RawDescriptor {
    file.as_raw_fd()
}

/// Opens the lock file read/write, creating it with `config.file_mode`
pub(crate) fn open(path: &Path, config: &LockConfig) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(config.file_mode)
        .open(path)
}

/// Whole-file record of the given type
fn record(kind: libc::c_short) -> libc::flock {
    // SAFETY: `flock` is a plain C struct for which all-zero bytes are valid
    let mut lck: libc::flock = unsafe { std::mem::zeroed() };
    lck.l_type = kind;
    lck.l_whence = libc::SEEK_SET as libc::c_short;
    lck.l_start = 0;
    // Zero length extends to end of file, including future growth
    lck.l_len = 0;
    lck
}

fn lock_kind(exclusive: bool) -> libc::c_short {
    if exclusive {
        libc::F_WRLCK as libc::c_short
    } else {
        libc::F_RDLCK as libc::c_short
    }
}

/// Issues `F_SETLK`. Returns `Ok(false)` when another process holds a
/// conflicting lock.
fn set_lock(file: &File, lck: &libc::flock) -> io::Result<bool> {
    loop {
        // SAFETY: the descriptor is open for the lifetime of `file` and `lck`
        // points to an initialized record
        let ret =
            unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETLK, lck as *const libc::flock) };
        if ret != -1 {
            return Ok(true);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) | Some(libc::EACCES) => return Ok(false),
            Some(libc::EINTR) => continue,
            _ => return Err(err),
        }
    }
}

/// One non-blocking attempt
pub(crate) fn try_lock(file: &File, exclusive: bool) -> io::Result<bool> {
    set_lock(file, &record(lock_kind(exclusive)))
}

/// Releases the whole-file record lock
pub(crate) fn unlock(file: &File) -> io::Result<()> {
    set_lock(file, &record(libc::F_UNLCK as libc::c_short)).map(|_| ())
}

/// A pending lock request.
///
/// `F_SETLKW` can only block without bound, so a slice is spent polling
/// `F_SETLK` with exponential backoff instead. The backoff carries over
/// between slices.
///
/// Polling never joins the kernel's wait queue. Waiters get no fairness and
/// no FIFO handoff: a holder that releases and relocks quickly can starve
/// them. A release is also noticed only at the next poll, up to
/// `lock.poll_max_ms` after it happened.
pub(crate) struct Waiter<'a> {
    file: &'a File,
    lck: libc::flock,
    delay: Duration,
    max_delay: Duration,
}

impl<'a> Waiter<'a> {
    pub(crate) fn start(file: &'a File, exclusive: bool, config: &LockConfig) -> io::Result<Self> {
        Ok(Self {
            file,
            lck: record(lock_kind(exclusive)),
            delay: config.poll_initial(),
            max_delay: config.poll_max(),
        })
    }

    /// Waits at most `slice` for the lock. Returns `Ok(true)` once it is held.
    pub(crate) fn wait(&mut self, slice: Duration) -> io::Result<bool> {
        let slice_end = Instant::now() + slice;

        loop {
            if set_lock(self.file, &self.lck)? {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= slice_end {
                return Ok(false);
            }

            thread::sleep(self.delay.min(slice_end - now));
            self.delay = (self.delay * 2).min(self.max_delay);
        }
    }
}
