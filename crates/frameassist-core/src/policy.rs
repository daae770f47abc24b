//! Collaborator interfaces consumed by the assistant.
//!
//! The assistant never talks to hardware or to the kernel directly; it only
//! reads a clock, asks a placement policy for a boost margin, and pokes the
//! frequency governor. All three seams are object-safe traits so tests can
//! inject deterministic implementations.

use std::time::Instant;

use crate::topology::CpuId;

/// Monotonic time source, in nanoseconds since an arbitrary origin.
pub trait Clock: Send + Sync {
    /// Current monotonic timestamp in nanoseconds.
    fn now_ns(&self) -> u64;
}

/// Production clock anchored to process start.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        let nanos = self.origin.elapsed().as_nanos();
        if nanos > u128::from(u64::MAX) {
            u64::MAX
        } else {
            nanos as u64
        }
    }
}

/// CPU-frequency governor hook.
///
/// `request_update` must be cheap and non-blocking; it is invoked from
/// scheduler-tick context.
pub trait FrequencyGovernor: Send + Sync {
    /// Ask the governor to re-evaluate the frequency of the domain containing
    /// `cpu`. `immediate` bypasses any governor-side coalescing.
    fn request_update(&self, cpu: CpuId, immediate: bool);
}

/// Placement policy supplying the headroom added on top of a group's
/// utilization before a cluster is chosen.
pub trait BoostPolicy: Send + Sync {
    /// Extra capacity demanded for `util` at the given boost level.
    fn boost_margin(&self, util: u64, boost_level: u32) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_is_non_decreasing() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }
}
