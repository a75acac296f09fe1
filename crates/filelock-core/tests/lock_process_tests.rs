//! Process-level file locking tests
//!
//! Record locks belong to the process, so contention is produced by the
//! `lock_holder` and `lock_probe` example binaries running as children.

use filelock_core::{InterruptFlag, LockConfig, LockError, Locker, TimeoutSpec};
use filelock_testkit::{example_bin, probe_lock, spawn_lock_holder};
use std::fs;
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Slack allowed on top of a deadline for slice granularity and scheduling
const SLACK: Duration = Duration::from_millis(1500);

#[test]
fn test_immediate_returns_none_when_held_elsewhere() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("busy.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);
    let mut locker = Locker::new();

    let start = Instant::now();
    let result = locker.lock(&lock_path, true, TimeoutSpec::Immediate);

    assert!(matches!(result, Ok(None)), "got {:?}", result);
    assert!(
        start.elapsed() < Duration::from_millis(500),
        "Immediate must not wait, took {:?}",
        start.elapsed()
    );
    assert!(locker.registry().is_empty());

    assert!(holder.release().success());
}

#[test]
fn test_bounded_acquires_when_holder_releases() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("handoff.lock");
    let timeout = Duration::from_secs(4);
    let holder = spawn_lock_holder(&lock_path, 500, false);
    let mut locker = Locker::new();

    let start = Instant::now();
    let handle = locker
        .lock(&lock_path, true, TimeoutSpec::Bounded(timeout))
        .unwrap();

    assert!(handle.is_some(), "Should acquire once the holder lets go");
    assert!(
        start.elapsed() < timeout,
        "Should not run into the deadline, took {:?}",
        start.elapsed()
    );

    assert!(holder.release().success());
}

#[test]
fn test_bounded_times_out_while_held() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("timeout.lock");
    let timeout = Duration::from_millis(700);
    let holder = spawn_lock_holder(&lock_path, 0, false);
    let mut locker = Locker::new();

    let start = Instant::now();
    let result = locker.lock(&lock_path, true, TimeoutSpec::Bounded(timeout));
    let elapsed = start.elapsed();

    assert!(matches!(result, Ok(None)), "got {:?}", result);
    assert!(elapsed >= timeout, "Returned early after {:?}", elapsed);
    assert!(elapsed < timeout + SLACK, "Overran deadline: {:?}", elapsed);

    assert!(holder.release().success());
}

#[test]
fn test_interrupt_cancels_infinite_wait() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("interrupt.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);

    let flag = InterruptFlag::new();
    let mut locker = Locker::new().with_interrupt(flag.clone());
    let trigger_after = Duration::from_millis(300);

    let trigger = std::thread::spawn(move || {
        std::thread::sleep(trigger_after);
        flag.trigger();
    });

    let start = Instant::now();
    let result = locker.lock(&lock_path, true, TimeoutSpec::Infinite);
    let elapsed = start.elapsed();
    trigger.join().unwrap();

    let err = result.expect_err("Interrupted wait must be an error");
    assert!(matches!(err, LockError::Interrupted { .. }), "got {:?}", err);
    assert!(err.is_interrupted());
    assert!(
        elapsed < trigger_after + locker.config().interrupt_interval() + SLACK,
        "Interrupt should be seen within a slice, took {:?}",
        elapsed
    );
    assert!(locker.registry().is_empty());

    assert!(holder.release().success());
}

#[test]
fn test_short_interrupt_interval_is_honored() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("interval.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);

    let config = LockConfig {
        interrupt_interval_ms: 50,
        ..LockConfig::default()
    };
    let flag = InterruptFlag::new();
    flag.trigger();
    let mut locker = Locker::with_config(config).with_interrupt(flag);

    // Already pending: the first slice ends the wait
    let start = Instant::now();
    let result = locker.lock(&lock_path, true, TimeoutSpec::Infinite);

    assert!(matches!(result, Err(LockError::Interrupted { .. })));
    assert!(start.elapsed() < Duration::from_millis(50) + SLACK);

    assert!(holder.release().success());
}

#[test]
fn test_shared_locks_coexist_across_processes() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("readers.lock");
    let holder = spawn_lock_holder(&lock_path, 0, true);

    assert!(probe_lock(&lock_path, true), "Shared should join a shared holder");
    assert!(
        !probe_lock(&lock_path, false),
        "Exclusive must be refused while a shared holder exists"
    );

    assert!(holder.release().success());
    assert!(probe_lock(&lock_path, false));
}

#[test]
fn test_exclusive_holder_refuses_shared() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("writer.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);

    assert!(!probe_lock(&lock_path, true));
    assert!(!probe_lock(&lock_path, false));

    assert!(holder.release().success());
}

#[test]
fn test_unlock_makes_lock_available_to_others() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("handback.lock");
    let mut locker = Locker::new();

    let mut handle = locker
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();
    assert!(!probe_lock(&lock_path, false), "Held lock must be visible to others");

    locker.unlock(&mut handle);
    assert!(probe_lock(&lock_path, false), "Released lock must be free");

    // And this process can take it again
    let again = locker.lock(&lock_path, true, TimeoutSpec::Immediate).unwrap();
    assert!(again.is_some());
}

#[test]
fn test_releasing_one_shared_handle_keeps_os_lock() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("dedup.lock");
    let mut locker = Locker::new();

    let mut first = locker
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();
    let mut second = locker
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();

    locker.unlock(&mut first);
    assert!(
        !probe_lock(&lock_path, false),
        "Lock must stay held while another handle remains"
    );

    locker.unlock(&mut second);
    assert!(probe_lock(&lock_path, false));
}

#[test]
fn test_dropped_handle_releases_os_lock() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("dropped.lock");
    let mut locker = Locker::new();

    let handle = locker
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();
    assert!(!probe_lock(&lock_path, false));

    drop(handle);
    assert!(probe_lock(&lock_path, false));
}

#[test]
fn test_second_locker_cannot_orphan_os_lock() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("two-lockers.lock");
    let mut first = Locker::new();
    let mut second = Locker::new();

    let mut handle = first
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();

    let result = second.lock(&lock_path, true, TimeoutSpec::Immediate);
    assert!(
        matches!(result, Err(LockError::HeldByOtherLocker { .. })),
        "got {:?}",
        result
    );
    // The refused attempt opened nothing that could drop the lock
    assert!(!probe_lock(&lock_path, false));

    first.unlock(&mut handle);
    assert!(probe_lock(&lock_path, false));

    let taken = second
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();
    assert!(!probe_lock(&lock_path, false), "Second locker now holds it");
    assert!(!second.is_unlocked(&taken));
}

#[test]
fn test_contention_leaves_path_open_to_other_lockers() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("contended-lockers.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);
    let mut first = Locker::new();
    let mut second = Locker::new();

    assert!(first
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .is_none());
    // Contention in one locker must not leave the path reserved
    assert!(second
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .is_none());

    assert!(holder.release().success());
    assert!(second
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .is_some());
}

#[test]
fn test_killed_holder_releases_lock() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("killed.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);
    let mut locker = Locker::new();

    assert!(locker
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .is_none());

    // Dropping kills the child without unlocking
    drop(holder);

    let handle = locker
        .lock(&lock_path, true, TimeoutSpec::Bounded(Duration::from_secs(2)))
        .unwrap();
    assert!(handle.is_some(), "The OS releases a dead holder's lock");
}

/// Many processes incrementing one counter under the lock lose no update
#[test]
fn test_counter_with_lock_no_lost_updates() {
    let temp = TempDir::new().unwrap();
    let counter_path = temp.path().join("counter.txt");
    fs::write(&counter_path, "0").unwrap();

    const NUM_PROCESSES: usize = 5;
    const ITERATIONS_PER_PROCESS: usize = 20;

    let mut handles = vec![];
    for _ in 0..NUM_PROCESSES {
        let counter_path = counter_path.clone();
        let handle = std::thread::spawn(move || {
            let status = Command::new(example_bin("counter_child_locked"))
                .arg(&counter_path)
                .arg(ITERATIONS_PER_PROCESS.to_string())
                .status()
                .expect("Failed to execute counter_child_locked");

            assert!(
                status.success(),
                "counter_child_locked should exit successfully"
            );
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let final_count: u32 = fs::read_to_string(&counter_path)
        .unwrap()
        .trim()
        .parse()
        .unwrap();

    let expected = (NUM_PROCESSES * ITERATIONS_PER_PROCESS) as u32;
    assert_eq!(
        final_count, expected,
        "With locks, should have no lost updates: got {}, expected {}",
        final_count, expected
    );
}
