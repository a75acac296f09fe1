//! Output helpers and exit codes shared by the commands

use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Exit code when the lock could not be taken within the timeout
pub const EXIT_NOT_ACQUIRED: i32 = 2;

/// JSON report of a single lock attempt
#[derive(Debug, Serialize)]
pub struct LockReport {
    pub schema_version: &'static str,
    pub path: String,
    pub mode: &'static str,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl LockReport {
    pub fn new(path: &Path, exclusive: bool, available: bool) -> Self {
        Self {
            schema_version: "1.0",
            path: path.display().to_string(),
            mode: mode_name(exclusive),
            available,
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

pub fn mode_name(exclusive: bool) -> &'static str {
    if exclusive { "exclusive" } else { "shared" }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{s}")?;
    Ok(())
}

pub fn print_text(s: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{s}")?;
    out.flush()
}

/// `✓`/`✗` line for an attempt
pub fn status_line(ok: bool, message: &str) -> String {
    if ok {
        format!("{} {}", "✓".green(), message)
    } else {
        format!("{} {}", "✗".red(), message)
    }
}
