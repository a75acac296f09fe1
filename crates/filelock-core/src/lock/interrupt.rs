//! Interrupt sources polled between wait slices

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something a waiting acquisition can poll to learn it should give up.
///
/// Polled once per wait slice, never while the OS call is in progress.
pub trait Interrupt: Send + Sync {
    fn is_pending(&self) -> bool;
}

/// Interrupt source that never fires
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverInterrupt;

impl Interrupt for NeverInterrupt {
    fn is_pending(&self) -> bool {
        false
    }
}

/// Shared flag another thread can raise to cancel a wait.
///
/// Clones share the same flag. Once triggered it stays set until
/// [`InterruptFlag::reset`] is called, so every wait started meanwhile is
/// cancelled as well.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

impl Interrupt for InterruptFlag {
    fn is_pending(&self) -> bool {
        self.is_set()
    }
}

impl<F> Interrupt for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_pending(&self) -> bool {
        self()
    }
}
