//! Rate-limited frequency-governor notification.

use std::sync::Arc;

use crate::policy::FrequencyGovernor;
use crate::topology::CpuId;

/// Pushes utilization refreshes to the frequency governor, coalescing
/// non-urgent requests to at most one per `interval_ns`.
pub struct FrequencyHintEmitter {
    governor: Arc<dyn FrequencyGovernor>,
}

impl FrequencyHintEmitter {
    /// Create an emitter targeting `governor`.
    pub fn new(governor: Arc<dyn FrequencyGovernor>) -> Self {
        Self { governor }
    }

    /// Notify the governor about `cpu`.
    ///
    /// `immediate` bypasses rate limiting; otherwise the notification is
    /// dropped unless `interval_ns` has elapsed since `*last_update_ns`.
    /// A `*last_update_ns` of zero means nothing was ever sent, so the
    /// first hint always goes through.
    /// Returns whether a notification was actually sent.
    pub fn push(
        &self,
        cpu: CpuId,
        now_ns: u64,
        last_update_ns: &mut u64,
        interval_ns: u64,
        immediate: bool,
    ) -> bool {
        if !immediate
            && *last_update_ns != 0
            && now_ns.saturating_sub(*last_update_ns) < interval_ns
        {
            tracing::trace!(%cpu, "frequency hint rate-limited");
            return false;
        }
        *last_update_ns = now_ns;
        self.governor.request_update(cpu, immediate);
        true
    }
}

impl std::fmt::Debug for FrequencyHintEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyHintEmitter").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingGovernor {
        calls: Mutex<Vec<(CpuId, bool)>>,
    }

    impl FrequencyGovernor for CountingGovernor {
        fn request_update(&self, cpu: CpuId, immediate: bool) {
            self.calls.lock().push((cpu, immediate));
        }
    }

    #[test]
    fn test_rate_limit_applies() {
        let governor = Arc::new(CountingGovernor::default());
        let emitter = FrequencyHintEmitter::new(Arc::<CountingGovernor>::clone(&governor));
        let mut last = 0;

        assert!(emitter.push(CpuId(0), 10_000_000, &mut last, 8_000_000, false));
        // Too soon.
        assert!(!emitter.push(CpuId(0), 12_000_000, &mut last, 8_000_000, false));
        // Interval elapsed.
        assert!(emitter.push(CpuId(0), 18_000_000, &mut last, 8_000_000, false));
        assert_eq!(governor.calls.lock().len(), 2);
    }

    #[test]
    fn test_first_hint_is_never_rate_limited() {
        let governor = Arc::new(CountingGovernor::default());
        let emitter = FrequencyHintEmitter::new(Arc::<CountingGovernor>::clone(&governor));
        let mut last = 0;

        // Nothing was ever sent, so the interval does not apply yet.
        assert!(emitter.push(CpuId(0), 1_000, &mut last, 8_000_000, false));
        assert_eq!(last, 1_000);
        // From here on it does.
        assert!(!emitter.push(CpuId(0), 2_000, &mut last, 8_000_000, false));
        assert_eq!(governor.calls.lock().len(), 1);
    }

    #[test]
    fn test_immediate_bypasses_rate_limit() {
        let governor = Arc::new(CountingGovernor::default());
        let emitter = FrequencyHintEmitter::new(Arc::<CountingGovernor>::clone(&governor));
        let mut last = 0;

        assert!(emitter.push(CpuId(1), 1_000, &mut last, 8_000_000, false));
        assert!(emitter.push(CpuId(1), 2_000, &mut last, 8_000_000, true));
        let calls = governor.calls.lock();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().any(|(_, immediate)| *immediate));
    }
}
