//! Every outcome other than success closes the lock file
//!
//! Counts entries of `/proc/self/fd`, so these run on Linux only and are
//! serialized: a concurrent test opening files would skew the count.

#![cfg(target_os = "linux")]

use filelock_core::{InterruptFlag, LockError, Locker, TimeoutSpec};
use filelock_testkit::{open_descriptor_count, spawn_lock_holder};
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;

fn fd_count() -> usize {
    open_descriptor_count().expect("/proc/self/fd should be readable")
}

#[test]
#[serial]
fn test_lock_unlock_cycles_do_not_leak() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("cycle.lock");
    let mut locker = Locker::new();

    let before = fd_count();
    for _ in 0..50 {
        let mut handle = locker
            .lock(&lock_path, true, TimeoutSpec::Immediate)
            .unwrap()
            .unwrap();
        locker.unlock(&mut handle);
    }

    assert_eq!(fd_count(), before);
}

#[test]
#[serial]
fn test_held_lock_uses_one_descriptor() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("one.lock");
    let mut locker = Locker::new();

    let before = fd_count();
    let handles: Vec<_> = (0..5)
        .map(|_| {
            locker
                .lock(&lock_path, true, TimeoutSpec::Immediate)
                .unwrap()
                .unwrap()
        })
        .collect();

    assert_eq!(fd_count(), before + 1, "Handles on one path share a descriptor");

    drop(handles);
    assert_eq!(fd_count(), before);
}

#[test]
#[serial]
fn test_contention_failures_do_not_leak() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("contended.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);
    let mut locker = Locker::new();

    let before = fd_count();
    for _ in 0..20 {
        assert!(locker
            .lock(&lock_path, true, TimeoutSpec::Immediate)
            .unwrap()
            .is_none());
    }
    assert!(locker
        .lock(&lock_path, true, TimeoutSpec::Bounded(Duration::from_millis(250)))
        .unwrap()
        .is_none());

    assert_eq!(fd_count(), before);
    drop(holder);
}

#[test]
#[serial]
fn test_interrupted_wait_does_not_leak() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("interrupted.lock");
    let holder = spawn_lock_holder(&lock_path, 0, false);

    let flag = InterruptFlag::new();
    flag.trigger();
    let mut locker = Locker::new().with_interrupt(flag);

    let before = fd_count();
    let result = locker.lock(&lock_path, true, TimeoutSpec::Infinite);

    assert!(matches!(result, Err(LockError::Interrupted { .. })));
    assert_eq!(fd_count(), before);
    drop(holder);
}

#[test]
#[serial]
fn test_fatal_failures_do_not_leak() {
    let temp = TempDir::new().unwrap();
    let mut locker = Locker::new();

    let before = fd_count();

    let missing = temp.path().join("no/such/dir.lock");
    assert!(matches!(
        locker.lock(&missing, true, TimeoutSpec::Immediate),
        Err(LockError::Open { .. })
    ));

    let lock_path = temp.path().join("upgrade.lock");
    let shared = locker
        .lock(&lock_path, false, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();
    let during = fd_count();
    assert!(matches!(
        locker.lock(&lock_path, true, TimeoutSpec::Immediate),
        Err(LockError::UpgradeUnsupported { .. })
    ));
    assert_eq!(fd_count(), during);

    drop(shared);
    assert_eq!(fd_count(), before);
}

#[test]
#[serial]
fn test_refused_second_locker_opens_nothing() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("refused.lock");
    let mut owner = Locker::new();
    let mut other = Locker::new();

    let handle = owner
        .lock(&lock_path, true, TimeoutSpec::Immediate)
        .unwrap()
        .unwrap();
    let during = fd_count();

    assert!(matches!(
        other.lock(&lock_path, true, TimeoutSpec::Immediate),
        Err(LockError::HeldByOtherLocker { .. })
    ));
    assert_eq!(fd_count(), during);

    drop(handle);
}
