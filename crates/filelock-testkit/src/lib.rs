//! Test utilities for filelock
//!
//! Record locks are owned by the process, so contention can only be
//! observed from a second process. This crate locates the helper example
//! binaries and drives them from tests.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use tempfile::TempDir;

/// Line the `lock_holder` example prints once it holds the lock
pub const LOCKED_MARKER: &str = "locked";

/// Exit code of the `lock_probe` example when the lock is held elsewhere
pub const PROBE_BUSY_EXIT: i32 = 3;

/// Creates a temporary directory within `.tmp/` at the project root
///
/// # Panics
///
/// Panics if the current directory cannot be determined or `.tmp/` cannot
/// be created.
///
/// # Examples
///
/// ```rust
/// use filelock_testkit::temp_dir_in_workspace;
///
/// let temp = temp_dir_in_workspace();
/// let lock_path = temp.path().join("test.lock");
/// std::fs::write(&lock_path, "").unwrap();
/// ```
pub fn temp_dir_in_workspace() -> TempDir {
    try_temp_dir_in_workspace().expect("Failed to create temporary directory in .tmp/")
}

/// Alternative with Result for non-test code
pub fn try_temp_dir_in_workspace() -> std::io::Result<TempDir> {
    let workspace_root = std::env::current_dir()?;
    let tmp_base = workspace_root.join(".tmp");
    std::fs::create_dir_all(&tmp_base)?;
    TempDir::new_in(&tmp_base)
}

/// Get the path to a compiled example binary
///
/// Example binaries live in `target/<profile>/examples/`, next to the
/// `deps/` directory holding the running test binary.
///
/// # Panics
///
/// Panics if unable to determine the current executable path
pub fn example_bin(name: &str) -> PathBuf {
    let mut path = std::env::current_exe().expect("Failed to get current executable path");

    path.pop(); // test binary
    path.pop(); // deps
    path.push("examples");
    path.push(name);

    if cfg!(target_os = "windows") {
        path.set_extension("exe");
    }

    path
}

/// A `lock_holder` child process that holds a lock on a path.
///
/// The child is killed when this value is dropped, which releases its lock.
pub struct HolderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

/// Starts `lock_holder` and returns once it reports the lock as held.
///
/// With `hold_ms == 0` the child holds until [`HolderProcess::release`] is
/// called (it waits for end of input); otherwise it releases on its own
/// after `hold_ms` milliseconds.
///
/// # Panics
///
/// Panics if the child cannot be started or exits before locking.
pub fn spawn_lock_holder(lock_path: &Path, hold_ms: u64, shared: bool) -> HolderProcess {
    let mut cmd = Command::new(example_bin("lock_holder"));
    cmd.arg(lock_path)
        .arg(hold_ms.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped());
    if shared {
        cmd.arg("--shared");
    }

    let mut child = cmd.spawn().expect("Failed to spawn lock_holder");
    let stdout = child.stdout.take().expect("lock_holder stdout is piped");
    let stdin = child.stdin.take();

    let mut line = String::new();
    BufReader::new(stdout)
        .read_line(&mut line)
        .expect("Failed to read from lock_holder");

    if line.trim() != LOCKED_MARKER {
        let _ = child.kill();
        let status = child.wait();
        panic!(
            "lock_holder did not lock '{}' (said {:?}, status {:?})",
            lock_path.display(),
            line.trim(),
            status
        );
    }

    HolderProcess { child, stdin }
}

impl HolderProcess {
    /// Closes the holder's input and waits for it to exit.
    ///
    /// An untimed holder releases at once; a timed one when its timer ends.
    pub fn release(mut self) -> ExitStatus {
        drop(self.stdin.take());
        self.child.wait().expect("Failed to wait for lock_holder")
    }
}

impl Drop for HolderProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Runs `lock_probe` once against `lock_path`.
///
/// Returns `true` if the probe could take the lock without waiting.
///
/// # Panics
///
/// Panics if the probe fails for any reason other than contention.
pub fn probe_lock(lock_path: &Path, shared: bool) -> bool {
    let mut cmd = Command::new(example_bin("lock_probe"));
    cmd.arg(lock_path);
    if shared {
        cmd.arg("--shared");
    }

    let status = cmd.status().expect("Failed to run lock_probe");
    match status.code() {
        Some(0) => true,
        Some(PROBE_BUSY_EXIT) => false,
        _ => panic!("lock_probe failed on '{}': {}", lock_path.display(), status),
    }
}

/// Number of descriptors open in this process, where the platform exposes it
pub fn open_descriptor_count() -> Option<usize> {
    if cfg!(target_os = "linux") {
        std::fs::read_dir("/proc/self/fd").ok().map(|d| d.count())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_in_workspace_creates_in_tmp() {
        let temp = temp_dir_in_workspace();
        let path = temp.path();

        assert!(
            path.to_string_lossy().contains(".tmp"),
            "Path should contain .tmp, got: {}",
            path.display()
        );
        assert!(path.is_dir(), "Path should be a directory");
    }

    #[test]
    fn test_temp_dir_auto_cleanup() {
        let path = {
            let temp = temp_dir_in_workspace();
            temp.path().to_path_buf()
        };

        assert!(
            !path.exists(),
            "Directory should not exist after drop: {}",
            path.display()
        );
    }

    #[test]
    fn test_example_bin_returns_correct_path() {
        let path = example_bin("lock_holder");

        assert!(
            path.to_string_lossy().contains("examples"),
            "Path should contain 'examples' directory"
        );

        let file_name = path.file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("lock_holder"));

        #[cfg(target_os = "windows")]
        assert!(file_name.ends_with(".exe"));

        #[cfg(not(target_os = "windows"))]
        assert!(!file_name.ends_with(".exe"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_descriptor_count_tracks_files() {
        let temp = temp_dir_in_workspace();
        let before = open_descriptor_count().unwrap();

        let files: Vec<_> = (0..8)
            .map(|i| std::fs::File::create(temp.path().join(format!("fd{}.txt", i))).unwrap())
            .collect();
        let during = open_descriptor_count().unwrap();
        drop(files);

        assert!(during > before, "before {}, during {}", before, during);
    }
}
