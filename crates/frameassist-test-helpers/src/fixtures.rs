//! Fixture builders for assistant tests.

use std::sync::Arc;

use frameassist_core::prelude::*;

use crate::clock::FakeClock;
use crate::mock::{FixedMarginPolicy, RecordingGovernor};

/// Two clusters: four little CPUs at capacity 512, four big at 1024.
pub fn two_tier_topology() -> CpuTopology {
    CpuTopology::new(vec![
        Cluster::new(
            ClusterId(0),
            512,
            vec![CpuId(0), CpuId(1), CpuId(2), CpuId(3)],
        ),
        Cluster::new(
            ClusterId(1),
            1024,
            vec![CpuId(4), CpuId(5), CpuId(6), CpuId(7)],
        ),
    ])
    .unwrap()
}

/// Everything a deterministic assistant test needs in one place.
pub struct TestHarness {
    /// The manually advanced clock driving the assistant.
    pub clock: Arc<FakeClock>,
    /// The recording governor the assistant notifies.
    pub governor: Arc<RecordingGovernor>,
    /// The assistant under test.
    pub assist: SchedulerAssistant,
}

/// Build an assistant over [`two_tier_topology`] with a fake clock, a
/// recording governor and a zero-margin policy.
pub fn harness() -> TestHarness {
    let clock = Arc::new(FakeClock::new());
    let governor = Arc::new(RecordingGovernor::new());
    let assist = SchedulerAssistant::builder()
        .clock(Arc::<FakeClock>::clone(&clock) as Arc<dyn Clock>)
        .topology(two_tier_topology())
        .governor(Arc::<RecordingGovernor>::clone(&governor) as Arc<dyn FrequencyGovernor>)
        .policy(Arc::new(FixedMarginPolicy::zero()))
        .build()
        .unwrap();
    TestHarness {
        clock,
        governor,
        assist,
    }
}

/// [`harness`] with one thread already attached, tracking enabled and the
/// frame rate/margin configured.
pub fn harness_with_group(group: GroupId, thread: ThreadId, fps: u32, margin_ms: i64) -> TestHarness {
    let h = harness();
    h.assist.attach_thread(thread, group).unwrap();
    h.assist.enable_frame_scheduling(group).unwrap();
    h.assist.set_frame_rate(group, fps).unwrap();
    h.assist.set_frame_margin(group, margin_ms).unwrap();
    h
}
