//! Helper binary that takes a lock and holds it
//!
//! Usage: lock_holder <lock_path> <hold_ms> [--shared]
//!
//! Prints `locked` once the lock is held. With `hold_ms` 0 the lock is held
//! until standard input reaches end of file, otherwise for `hold_ms`
//! milliseconds. Used by the cross-process tests.

use filelock_core::{Locker, TimeoutSpec};
use std::env;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: lock_holder <lock_path> <hold_ms> [--shared]");
        std::process::exit(1);
    }

    let lock_path = PathBuf::from(&args[1]);
    let hold_ms: u64 = args[2].parse().expect("hold_ms must be a number");
    let exclusive = args.get(3).map(String::as_str) != Some("--shared");

    let mut locker = Locker::new();
    let mut handle = locker
        .lock(&lock_path, exclusive, TimeoutSpec::Bounded(Duration::from_secs(10)))
        .expect("Failed to lock")
        .expect("Lock still held elsewhere after 10s");

    let mut stdout = io::stdout();
    writeln!(stdout, "locked").expect("Failed to write marker");
    stdout.flush().expect("Failed to flush marker");

    if hold_ms == 0 {
        let mut sink = Vec::new();
        let _ = io::stdin().read_to_end(&mut sink);
    } else {
        std::thread::sleep(Duration::from_millis(hold_ms));
    }

    locker.unlock(&mut handle);
}
