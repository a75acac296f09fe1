//! Run command - execute a command under the lock

use crate::cli::Target;
use crate::context::Context;
use crate::output::EXIT_NOT_ACQUIRED;
use anyhow::{Context as _, Result, bail};
use filelock_core::TimeoutSpec;
use std::process::Command;

/// Run `command` while holding the lock
///
/// The lock is released when the command exits, whatever its status.
///
/// # Exit Code
///
/// The command's exit code (1 if it was killed by a signal), or 2 when
/// the lock was not taken within `timeout`.
pub fn run(
    ctx: &mut Context,
    target: &Target,
    timeout: TimeoutSpec,
    command: &[String],
) -> Result<i32> {
    let Some((program, args)) = command.split_first() else {
        bail!("No command given");
    };

    let Some(mut handle) = ctx.locker.lock(&target.path, target.exclusive(), timeout)? else {
        eprintln!("{} not acquired ({})", target.path.display(), timeout);
        return Ok(EXIT_NOT_ACQUIRED);
    };

    log::debug!("running {:?} under {}", command, target.path.display());
    let status = Command::new(program).args(args).status();

    ctx.locker.unlock(&mut handle);

    let status = status.with_context(|| format!("Failed to run {}", program))?;
    Ok(status.code().unwrap_or(1))
}
