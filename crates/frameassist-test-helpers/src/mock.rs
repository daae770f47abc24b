//! Recording and fixed-behavior collaborator implementations.

use parking_lot::Mutex;

use frameassist_core::policy::{BoostPolicy, FrequencyGovernor};
use frameassist_core::topology::CpuId;

/// Governor that records every update request it receives.
#[derive(Debug, Default)]
pub struct RecordingGovernor {
    requests: Mutex<Vec<(CpuId, bool)>>,
}

impl RecordingGovernor {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(cpu, immediate)` requests seen so far.
    pub fn requests(&self) -> Vec<(CpuId, bool)> {
        self.requests.lock().clone()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.requests.lock().clear();
    }
}

impl FrequencyGovernor for RecordingGovernor {
    fn request_update(&self, cpu: CpuId, immediate: bool) {
        self.requests.lock().push((cpu, immediate));
    }
}

/// Policy returning the same margin for every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMarginPolicy {
    margin: u64,
}

impl FixedMarginPolicy {
    /// A policy that always adds `margin`.
    pub fn new(margin: u64) -> Self {
        Self { margin }
    }

    /// A policy that never boosts.
    pub fn zero() -> Self {
        Self::default()
    }
}

impl BoostPolicy for FixedMarginPolicy {
    fn boost_margin(&self, _util: u64, _boost_level: u32) -> u64 {
        self.margin
    }
}

/// Policy adding a proportional margin only while a boost is active,
/// mirroring how placement policies scale headroom with demand.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalMarginPolicy {
    /// Denominator: margin is `util / divisor`.
    pub divisor: u64,
}

impl BoostPolicy for ProportionalMarginPolicy {
    fn boost_margin(&self, util: u64, boost_level: u32) -> u64 {
        if boost_level == 0 || self.divisor == 0 {
            0
        } else {
            util / self.divisor
        }
    }
}
