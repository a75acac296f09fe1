//! Check command - report lock availability

use crate::cli::Target;
use crate::context::Context;
use crate::output::{self, LockReport};
use anyhow::Result;
use colored::Colorize;
use filelock_core::TimeoutSpec;

/// Report whether the lock could be taken right now
///
/// # Exit Code
///
/// Always 0. Failures to open or lock the file are reported in the
/// output, not via exit code.
pub fn run(ctx: &mut Context, target: &Target, json: bool) -> Result<i32> {
    let exclusive = target.exclusive();
    let report = match ctx
        .locker
        .lock(&target.path, exclusive, TimeoutSpec::Immediate)
    {
        Ok(Some(mut handle)) => {
            ctx.locker.unlock(&mut handle);
            LockReport::new(&target.path, exclusive, true)
        }
        Ok(None) => LockReport::new(&target.path, exclusive, false),
        Err(e) => LockReport::new(&target.path, exclusive, false).with_error(e.to_string()),
    };

    if json {
        output::print_json(&report)?;
        return Ok(0);
    }

    let message = match (&report.error, report.available) {
        (Some(error), _) => format!("{} cannot be checked: {}", report.path, error),
        (None, true) => format!("{} is available ({})", report.path, report.mode),
        (None, false) => format!("{} is held by another process ({})", report.path, report.mode),
    };
    output::print_text(&output::status_line(report.available, &message))?;

    if ctx.verbose {
        let lock = &ctx.config.lock;
        println!(
            "  {} interrupt interval {}ms, poll {}-{}ms",
            "→".cyan(),
            lock.interrupt_interval_ms,
            lock.poll_initial_ms,
            lock.poll_max_ms
        );
    }

    Ok(0)
}
