//! Windows byte-range locks (`LockFileEx` on an overlapped handle)
//!
//! The file is opened with `FILE_FLAG_OVERLAPPED`, so a blocking lock
//! request returns `ERROR_IO_PENDING` and completes by signaling the event
//! in its `OVERLAPPED`. Waiting on that event with a timeout gives the
//! sliced wait directly.

use crate::config::LockConfig;
use std::fs::{File, OpenOptions};
use std::io;
use std::mem;
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::{AsRawHandle, RawHandle};
use std::path::Path;
use std::ptr;
use std::time::Duration;
use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_IO_PENDING, ERROR_LOCK_VIOLATION, FALSE, HANDLE, TRUE, WAIT_FAILED,
    WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::Storage::FileSystem::{
    LockFileEx, UnlockFileEx, FILE_FLAG_OVERLAPPED, FILE_SHARE_READ, FILE_SHARE_WRITE,
    LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
};
use windows_sys::Win32::System::Threading::{CreateEventW, WaitForSingleObject};
use windows_sys::Win32::System::IO::{CancelIoEx, GetOverlappedResult, OVERLAPPED};

/// Platform descriptor of an open lock file
pub type RawDescriptor = RawHandle;

// Range starts at offset 0 (zeroed OVERLAPPED) and spans u64::MAX bytes
const LOCK_LEN_LOW: u32 = u32::MAX;
const LOCK_LEN_HIGH: u32 = u32::MAX;

// INFINITE is u32::MAX; a slice must never turn into an unbounded wait
const MAX_SLICE_MS: u32 = u32::MAX - 1;

pub(crate) fn descriptor(file: &File) -> RawDescriptor {
    file.as_raw_handle()
}

fn raw(file: &File) -> HANDLE {
    file.as_raw_handle() as HANDLE
}

/// Opens the lock file for overlapped I/O, creating it if absent
pub(crate) fn open(path: &Path, _config: &LockConfig) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE)
        .custom_flags(FILE_FLAG_OVERLAPPED)
        .open(path)
}

fn lock_flags(exclusive: bool, fail_immediately: bool) -> u32 {
    let mut flags = 0;
    if exclusive {
        flags |= LOCKFILE_EXCLUSIVE_LOCK;
    }
    if fail_immediately {
        flags |= LOCKFILE_FAIL_IMMEDIATELY;
    }
    flags
}

fn is_lock_violation(err: &io::Error) -> bool {
    err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32)
}

/// One non-blocking attempt
pub(crate) fn try_lock(file: &File, exclusive: bool) -> io::Result<bool> {
    let mut waiter = match Waiter::issue(file, lock_flags(exclusive, true)) {
        Ok(waiter) => waiter,
        Err(e) if is_lock_violation(&e) => return Ok(false),
        Err(e) => return Err(e),
    };

    if waiter.done {
        return Ok(true);
    }

    // Fail-immediately requests may still report ERROR_IO_PENDING on an
    // overlapped handle, but they complete without waiting for the holder
    match waiter.complete(true) {
        Ok(acquired) => Ok(acquired),
        Err(e) if is_lock_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Releases the whole-file range lock
pub(crate) fn unlock(file: &File) -> io::Result<()> {
    // SAFETY: OVERLAPPED is plain data; zeroed means offset 0 with no event
    let mut overlapped: OVERLAPPED = unsafe { mem::zeroed() };

    // SAFETY: the handle is open and `overlapped` outlives the call, including
    // the pending case below, which blocks until completion
    let ok = unsafe { UnlockFileEx(raw(file), 0, LOCK_LEN_LOW, LOCK_LEN_HIGH, &mut overlapped) };
    if ok != FALSE {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() != Some(ERROR_IO_PENDING as i32) {
        return Err(err);
    }

    let mut transferred = 0u32;
    // SAFETY: see above
    let ok = unsafe { GetOverlappedResult(raw(file), &overlapped, &mut transferred, TRUE) };
    if ok != FALSE {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// An issued `LockFileEx` request and its completion event.
///
/// The `OVERLAPPED` is boxed so its address stays fixed while the kernel
/// owns it. Dropping a waiter whose request is still pending cancels the
/// request and reaps it before the box is freed.
pub(crate) struct Waiter<'a> {
    file: &'a File,
    overlapped: Box<OVERLAPPED>,
    event: HANDLE,
    pending: bool,
    done: bool,
}

impl<'a> Waiter<'a> {
    pub(crate) fn start(file: &'a File, exclusive: bool, _config: &LockConfig) -> io::Result<Self> {
        Self::issue(file, lock_flags(exclusive, false))
    }

    fn issue(file: &'a File, flags: u32) -> io::Result<Self> {
        // SAFETY: null attributes and name are allowed; manual reset, initially unsignaled
        let event = unsafe { CreateEventW(ptr::null(), TRUE, FALSE, ptr::null()) };
        if event.is_null() {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: OVERLAPPED is plain data; zeroed means offset 0
        let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { mem::zeroed() });
        overlapped.hEvent = event;

        let mut waiter = Waiter {
            file,
            overlapped,
            event,
            pending: false,
            done: false,
        };

        // SAFETY: the handle is open and the boxed OVERLAPPED lives until Drop
        // has reaped any pending request
        let ok = unsafe {
            LockFileEx(
                raw(file),
                flags,
                0,
                LOCK_LEN_LOW,
                LOCK_LEN_HIGH,
                &mut *waiter.overlapped,
            )
        };

        if ok != FALSE {
            waiter.done = true;
            return Ok(waiter);
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(ERROR_IO_PENDING as i32) {
            waiter.pending = true;
            Ok(waiter)
        } else {
            // Drop closes the event
            Err(err)
        }
    }

    /// Waits at most `slice` for the lock. Returns `Ok(true)` once it is held.
    pub(crate) fn wait(&mut self, slice: Duration) -> io::Result<bool> {
        if self.done {
            return Ok(true);
        }

        let ms = u32::try_from(slice.as_millis())
            .unwrap_or(MAX_SLICE_MS)
            .min(MAX_SLICE_MS);
        // SAFETY: the event handle is owned by this waiter
        match unsafe { WaitForSingleObject(self.event, ms) } {
            WAIT_OBJECT_0 => self.complete(false),
            WAIT_TIMEOUT => Ok(false),
            WAIT_FAILED => Err(io::Error::last_os_error()),
            other => Err(io::Error::other(format!(
                "unexpected wait result {other:#x}"
            ))),
        }
    }

    /// Collects the result of a request that has completed (or, with
    /// `block`, will complete promptly)
    fn complete(&mut self, block: bool) -> io::Result<bool> {
        let mut transferred = 0u32;
        // SAFETY: the OVERLAPPED belongs to the request issued on this handle
        let ok = unsafe {
            GetOverlappedResult(
                raw(self.file),
                &*self.overlapped,
                &mut transferred,
                if block { TRUE } else { FALSE },
            )
        };
        self.pending = false;

        if ok != FALSE {
            self.done = true;
            Ok(true)
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.pending {
            let mut transferred = 0u32;
            // SAFETY: cancels only the request tied to this OVERLAPPED, then
            // blocks until the kernel has released it
            let granted = unsafe {
                CancelIoEx(raw(self.file), &*self.overlapped);
                GetOverlappedResult(raw(self.file), &*self.overlapped, &mut transferred, TRUE)
            };
            if granted != FALSE {
                // Granted just before the cancel; closing the file releases it
                log::trace!("lock request completed while being cancelled");
            }
        }

        // SAFETY: the event is owned by this waiter and no request uses it anymore
        unsafe {
            CloseHandle(self.event);
        }
    }
}
