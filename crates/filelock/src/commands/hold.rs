//! Hold command - take the lock and keep it

use crate::cli::Target;
use crate::context::Context;
use crate::output::{self, EXIT_NOT_ACQUIRED};
use anyhow::{Context as _, Result};
use filelock_core::TimeoutSpec;
use std::io::{self, Read};
use std::time::Duration;

/// Take the lock, announce it, and hold it
///
/// Prints `locked <path>` once the lock is held. The lock is released
/// after `hold_ms` milliseconds, or when standard input reaches end of
/// file if no duration is given.
///
/// # Exit Code
///
/// 0 after releasing, 2 when the lock was not taken within `timeout`.
pub fn run(
    ctx: &mut Context,
    target: &Target,
    timeout: TimeoutSpec,
    hold_ms: Option<u64>,
) -> Result<i32> {
    let Some(mut handle) = ctx.locker.lock(&target.path, target.exclusive(), timeout)? else {
        eprintln!("{} not acquired ({})", target.path.display(), timeout);
        return Ok(EXIT_NOT_ACQUIRED);
    };

    output::print_text(&format!("locked {}", target.path.display()))?;

    match hold_ms {
        Some(ms) => std::thread::sleep(Duration::from_millis(ms)),
        None => {
            let mut sink = Vec::new();
            io::stdin()
                .read_to_end(&mut sink)
                .context("Failed to read standard input")?;
        }
    }

    ctx.locker.unlock(&mut handle);
    log::debug!("released {}", target.path.display());
    Ok(0)
}
