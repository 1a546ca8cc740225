//! Advisory pause signal for the iteration loop
//!
//! The registry mutex is the correctness lock; this signal is a latency
//! hint layered on top of it. Control-path operations raise it while they
//! hold the lock, and the iteration loop voluntarily yields when it sees it
//! raised instead of contending hard. The two concerns stay separate: the
//! signal never substitutes for the mutex.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counting pause signal, raised via RAII guards
///
/// A counter rather than a flag so overlapping control-path sections keep
/// the signal raised until the last one finishes.
#[derive(Debug, Default)]
pub struct PauseSignal {
    raised: AtomicUsize,
}

impl PauseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal for the lifetime of the returned guard
    pub fn raise(&self) -> PauseGuard<'_> {
        self.raised.fetch_add(1, Ordering::Release);
        PauseGuard { signal: self }
    }

    /// Whether any control-path section currently holds the signal raised
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire) > 0
    }
}

/// Lowers the pause signal on drop
pub struct PauseGuard<'a> {
    signal: &'a PauseSignal,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.signal.raised.fetch_sub(1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_lower() {
        let signal = PauseSignal::new();
        assert!(!signal.is_raised());

        let guard = signal.raise();
        assert!(signal.is_raised());
        drop(guard);
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_overlapping_raises() {
        let signal = PauseSignal::new();
        let a = signal.raise();
        let b = signal.raise();
        drop(a);
        // still raised until the last guard drops
        assert!(signal.is_raised());
        drop(b);
        assert!(!signal.is_raised());
    }
}
