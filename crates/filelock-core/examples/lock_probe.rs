//! Helper binary that tries a lock once
//!
//! Usage: lock_probe <lock_path> [--shared]
//!
//! Exits 0 if the lock could be taken without waiting, 3 if it is held
//! elsewhere, 1 on any other failure.

use filelock_core::{Locker, TimeoutSpec};
use std::env;
use std::path::PathBuf;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: lock_probe <lock_path> [--shared]");
        process::exit(1);
    }

    let lock_path = PathBuf::from(&args[1]);
    let exclusive = args.get(2).map(String::as_str) != Some("--shared");

    let mut locker = Locker::new();
    match locker.lock(&lock_path, exclusive, TimeoutSpec::Immediate) {
        Ok(Some(mut handle)) => {
            locker.unlock(&mut handle);
            process::exit(0);
        }
        Ok(None) => process::exit(3),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
