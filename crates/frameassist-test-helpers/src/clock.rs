//! Manually advanced clock for deterministic timing tests.

use std::sync::atomic::{AtomicU64, Ordering};

use frameassist_core::policy::Clock;
use frameassist_core::{NSEC_PER_MSEC, NSEC_PER_SEC};

/// A clock whose time only moves when a test says so.
#[derive(Debug, Default)]
pub struct FakeClock {
    now_ns: AtomicU64,
}

impl FakeClock {
    /// Create a clock at t=0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at `now_ns`.
    pub fn at(now_ns: u64) -> Self {
        Self {
            now_ns: AtomicU64::new(now_ns),
        }
    }

    /// Advance by nanoseconds.
    pub fn advance_ns(&self, delta_ns: u64) {
        self.now_ns.fetch_add(delta_ns, Ordering::SeqCst);
    }

    /// Advance by milliseconds.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.advance_ns(delta_ms * NSEC_PER_MSEC);
    }

    /// Advance by seconds.
    pub fn advance_secs(&self, delta_s: u64) {
        self.advance_ns(delta_s * NSEC_PER_SEC);
    }

    /// Jump to an absolute timestamp.
    pub fn set_ns(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_advances() {
        let clock = FakeClock::new();
        assert_eq!(clock.now_ns(), 0);
        clock.advance_ms(5);
        assert_eq!(clock.now_ns(), 5 * NSEC_PER_MSEC);
        clock.set_ns(42);
        assert_eq!(clock.now_ns(), 42);
    }
}
