//! Try command - one attempt that never waits

use crate::cli::Target;
use crate::context::Context;
use crate::output::{self, EXIT_NOT_ACQUIRED, LockReport};
use anyhow::Result;
use filelock_core::TimeoutSpec;

/// Try to take the lock once and release it again
///
/// # Exit Code
///
/// 0 when the lock was taken, 2 when it is held elsewhere.
pub fn run(ctx: &mut Context, target: &Target, json: bool) -> Result<i32> {
    let acquired = ctx
        .locker
        .lock(&target.path, target.exclusive(), TimeoutSpec::Immediate)?;
    let ok = acquired.is_some();

    if let Some(mut handle) = acquired {
        ctx.locker.unlock(&mut handle);
    }

    if json {
        output::print_json(&LockReport::new(&target.path, target.exclusive(), ok))?;
    } else if ok {
        output::print_text(&output::status_line(
            true,
            &format!(
                "acquired {} lock on {}",
                output::mode_name(target.exclusive()),
                target.path.display()
            ),
        ))?;
    } else {
        output::print_text(&output::status_line(
            false,
            &format!("{} is locked by another process", target.path.display()),
        ))?;
    }

    Ok(if ok { 0 } else { EXIT_NOT_ACQUIRED })
}
