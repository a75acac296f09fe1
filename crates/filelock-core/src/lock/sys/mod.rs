//! Platform lock primitives
//!
//! Both backends expose the same surface:
//!
//! - `open(path, config)`: open or create the lock file for locking
//! - `try_lock(file, exclusive)`: one non-blocking attempt
//! - `Waiter::start` / `Waiter::wait(slice)`: a request that can be waited
//!   on for at most one slice at a time; dropping it abandons the request
//! - `unlock(file)`: best-effort release before close
//!
//! The range locked is always the whole file.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::*;
#[cfg(unix)]
pub use unix::RawDescriptor;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows::*;
#[cfg(windows)]
pub use windows::RawDescriptor;

#[cfg(not(any(unix, windows)))]
compile_error!("filelock-core supports Unix and Windows targets only");
