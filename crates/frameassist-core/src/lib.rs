//! Frame-deadline-aware scheduling assistant.
//!
//! This crate tracks groups of cooperating threads ("related thread groups"),
//! continuously computes a synthetic **virtual load** that anticipates an
//! approaching periodic deadline (for example one rendered display frame), and
//! emits a utilization hint that a CPU-frequency governor and a CPU-placement
//! policy consume to avoid missed deadlines while minimizing wasted power.
//! It includes:
//!
//! - **FrameInfo**: per-group deadline state machine and virtual-load math
//! - **WindowTracker**: current/previous window accounting with rollover
//! - **GroupRegistry**: group lifetime and thread membership
//! - **BoostTimer**: one-shot forced utilization floor with cancellable expiry
//! - **ClusterSelector**: maps required utilization to a preferred CPU cluster
//! - **FrequencyHintEmitter**: rate-limited notification of the governor
//!
//! # RT-Safety Guarantees
//!
//! - **No blocking I/O** on the tick or timer path
//! - **Bounded critical sections**: one fine-grained lock per group, a narrow
//!   lock for the fields the tick path touches
//! - **O(member count)** work per scheduler tick
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use frameassist_core::prelude::*;
//!
//! # fn demo(topology: CpuTopology,
//! #         governor: Arc<dyn FrequencyGovernor>,
//! #         policy: Arc<dyn BoostPolicy>) -> FrameSchedResult<()> {
//! let assist = SchedulerAssistant::builder()
//!     .topology(topology)
//!     .governor(governor)
//!     .policy(policy)
//!     .build()?;
//!
//! let group = GroupId(1);
//! assist.attach_thread(ThreadId(42), group)?;
//! assist.set_frame_rate(group, 60)?;
//! assist.signal_frame_boundary(group, BoundaryKind::Start, BoundaryFlags::default())?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]

pub mod assist;
pub mod boost;
pub mod cluster;
pub mod error;
pub mod frame;
pub mod freq;
pub mod group;
pub mod policy;
pub mod registry;
pub mod topology;
pub mod window;

pub mod prelude;

pub use assist::{SchedulerAssistant, SchedulerAssistantBuilder};
pub use boost::BoostTimer;
pub use cluster::ClusterSelector;
pub use error::{FrameSchedError, FrameSchedResult};
pub use frame::{BoundaryFlags, BoundaryKind, FrameInfo, FrameStatus};
pub use freq::FrequencyHintEmitter;
pub use group::{Group, GroupId, MemberEntry, ThreadId};
pub use policy::{BoostPolicy, Clock, FrequencyGovernor, MonotonicClock};
pub use registry::GroupRegistry;
pub use topology::{Cluster, ClusterId, CpuId, CpuTopology};
pub use window::WindowTracker;

/// Semantic upper bound of all utilization values.
pub const CAPACITY_SCALE: u64 = 1024;

/// Saturation value of the virtual load.
pub const FRAME_MAX_VLOAD: u64 = 1024;

/// Nanoseconds per millisecond.
pub const NSEC_PER_MSEC: u64 = 1_000_000;

/// Nanoseconds per second.
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Lowest accepted frame rate in frames per second.
pub const MIN_FRAME_RATE: u32 = 1;

/// Highest accepted frame rate in frames per second.
pub const MAX_FRAME_RATE: u32 = 120;

/// Frame rate applied to a group before any explicit configuration.
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Lowest accepted virtual-load margin in milliseconds.
pub const MIN_FRAME_MARGIN_MS: i64 = -100;

/// Highest accepted virtual-load margin in milliseconds.
pub const MAX_FRAME_MARGIN_MS: i64 = 100;

/// Virtual-load margin applied before any explicit configuration.
pub const DEFAULT_FRAME_MARGIN_MS: i64 = 16;

/// Progress-test multiplier for the staleness fallback: a frame is declared
/// invalid once the window outlives `util_invalid_interval` while
/// `executed_time * UTIL_INVALID_FACTOR` still lags the elapsed wall time.
pub const UTIL_INVALID_FACTOR: u64 = 4;

/// Highest group id the registry will materialize.
pub const MAX_GROUP_ID: u64 = 64;
