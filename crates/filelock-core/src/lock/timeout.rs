//! Timeout modes and lock requests

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How long an acquisition may wait for a contended lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutSpec {
    /// Try once and never block
    Immediate,
    /// Wait until acquired or interrupted
    Infinite,
    /// Wait at most this long
    Bounded(Duration),
}

impl TimeoutSpec {
    /// Integer convention used by hosts: `0` tries once, a negative value
    /// waits forever, a positive value is a bound in milliseconds.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            0 => TimeoutSpec::Immediate,
            ms if ms < 0 => TimeoutSpec::Infinite,
            ms => TimeoutSpec::Bounded(Duration::from_millis(ms.unsigned_abs())),
        }
    }

    /// True when the acquisition must not wait at all.
    ///
    /// `Bounded(0)` is the same request as `Immediate`.
    pub fn is_immediate(&self) -> bool {
        match self {
            TimeoutSpec::Immediate => true,
            TimeoutSpec::Infinite => false,
            TimeoutSpec::Bounded(d) => d.is_zero(),
        }
    }

    /// The bound, if there is one
    pub fn limit(&self) -> Option<Duration> {
        match self {
            TimeoutSpec::Immediate => Some(Duration::ZERO),
            TimeoutSpec::Infinite => None,
            TimeoutSpec::Bounded(d) => Some(*d),
        }
    }
}

impl Default for TimeoutSpec {
    fn default() -> Self {
        TimeoutSpec::Infinite
    }
}

impl From<Duration> for TimeoutSpec {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            TimeoutSpec::Immediate
        } else {
            TimeoutSpec::Bounded(d)
        }
    }
}

impl fmt::Display for TimeoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutSpec::Immediate => write!(f, "immediate"),
            TimeoutSpec::Infinite => write!(f, "infinite"),
            TimeoutSpec::Bounded(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

/// Error returned when a timeout string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeoutError(String);

impl fmt::Display for ParseTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid timeout '{}' (expected 'now', 'inf', '<n>ms', '<n>s' or milliseconds)",
            self.0
        )
    }
}

impl std::error::Error for ParseTimeoutError {}

impl FromStr for TimeoutSpec {
    type Err = ParseTimeoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseTimeoutError(s.to_string());

        match trimmed.to_ascii_lowercase().as_str() {
            "now" | "immediate" => return Ok(TimeoutSpec::Immediate),
            "inf" | "infinite" | "forever" => return Ok(TimeoutSpec::Infinite),
            _ => {}
        }

        if let Some(ms) = trimmed.strip_suffix("ms") {
            let ms: u64 = ms.trim().parse().map_err(|_| err())?;
            return Ok(Duration::from_millis(ms).into());
        }
        if let Some(secs) = trimmed.strip_suffix('s') {
            let secs: u64 = secs.trim().parse().map_err(|_| err())?;
            return Ok(Duration::from_secs(secs).into());
        }

        let ms: i64 = trimmed.parse().map_err(|_| err())?;
        Ok(TimeoutSpec::from_millis(ms))
    }
}

/// A single acquisition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    pub path: PathBuf,
    pub exclusive: bool,
    pub timeout: TimeoutSpec,
}

impl LockRequest {
    pub fn new(path: impl Into<PathBuf>, exclusive: bool, timeout: TimeoutSpec) -> Self {
        Self {
            path: path.into(),
            exclusive,
            timeout,
        }
    }

    /// Exclusive request with the given timeout
    pub fn exclusive(path: impl Into<PathBuf>, timeout: TimeoutSpec) -> Self {
        Self::new(path, true, timeout)
    }

    /// Shared request with the given timeout
    pub fn shared(path: impl Into<PathBuf>, timeout: TimeoutSpec) -> Self {
        Self::new(path, false, timeout)
    }
}
