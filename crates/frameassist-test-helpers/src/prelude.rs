//! Prelude for frameassist-test-helpers.

pub use crate::clock::FakeClock;
pub use crate::fixtures::{TestHarness, harness, harness_with_group, two_tier_topology};
pub use crate::mock::{FixedMarginPolicy, ProportionalMarginPolicy, RecordingGovernor};
