//! Advisory cross-process file locking
//!
//! `filelock-core` acquires whole-file advisory locks with three timeout
//! modes (try once, wait forever, wait with a deadline). Waiting happens on
//! the calling thread in bounded slices, so a host can interrupt a wait and
//! deadlines are honored without a helper thread.
//!
//! ```no_run
//! use filelock_core::{Locker, TimeoutSpec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut locker = Locker::new();
//! match locker.lock("/tmp/app.lock", true, TimeoutSpec::from_millis(5_000))? {
//!     Some(mut handle) => {
//!         // Critical section
//!         locker.unlock(&mut handle);
//!     }
//!     None => eprintln!("someone else holds the lock"),
//! }
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod lock;

// Re-export commonly used types
pub use config::{Config, ConfigError, LockConfig};
pub use lock::{
    Interrupt, InterruptFlag, LockError, LockHandle, LockRequest, Locker, NeverInterrupt,
    ParseTimeoutError, RawDescriptor, Registry, TimeoutSpec,
};
