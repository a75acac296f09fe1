//! Counter helper with file locking
//!
//! Usage: counter_child_locked <counter_path> <iterations>
//!
//! Performs read-modify-write cycles on a counter file, each under an
//! exclusive lock on `<counter_path>.lock`. Concurrent children must not
//! lose any increment.

use filelock_core::{Locker, TimeoutSpec};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: counter_child_locked <counter_path> <iterations>");
        std::process::exit(1);
    }

    let counter_path = PathBuf::from(&args[1]);
    let iterations: usize = args[2].parse().expect("iterations must be a number");
    let lock_path = counter_path.with_extension("lock");

    let mut locker = Locker::new();

    for _ in 0..iterations {
        let mut handle = locker
            .lock(&lock_path, true, TimeoutSpec::Bounded(Duration::from_secs(30)))
            .expect("Failed to lock counter")
            .expect("Timed out waiting for counter lock");

        let content = fs::read_to_string(&counter_path).expect("Failed to read counter file");
        let value: u32 = content
            .trim()
            .parse()
            .expect("Counter file should contain a number");

        // Widen the window between read and write
        std::thread::sleep(Duration::from_micros(10));

        fs::write(&counter_path, (value + 1).to_string()).expect("Failed to write counter file");

        locker.unlock(&mut handle);
    }

    println!("Counter child completed {} iterations", iterations);
}
