//! Prelude for frameassist-core.
//!
//! Re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust,ignore
//! use frameassist_core::prelude::*;
//!
//! let assist = SchedulerAssistant::builder()
//!     .topology(topology)
//!     .governor(governor)
//!     .policy(policy)
//!     .build()?;
//! ```

pub use crate::assist::{SchedulerAssistant, SchedulerAssistantBuilder};
pub use crate::boost::BoostTimer;
pub use crate::cluster::ClusterSelector;
pub use crate::error::{FrameSchedError, FrameSchedResult};
pub use crate::frame::{BoundaryFlags, BoundaryKind, FrameInfo, FrameStatus};
pub use crate::freq::FrequencyHintEmitter;
pub use crate::group::{Group, GroupId, MemberEntry, ThreadId};
pub use crate::policy::{BoostPolicy, Clock, FrequencyGovernor, MonotonicClock};
pub use crate::registry::GroupRegistry;
pub use crate::topology::{Cluster, ClusterId, CpuId, CpuTopology};
pub use crate::window::WindowTracker;
pub use crate::{
    CAPACITY_SCALE, DEFAULT_FRAME_RATE, FRAME_MAX_VLOAD, MAX_FRAME_MARGIN_MS, MAX_FRAME_RATE,
    MIN_FRAME_MARGIN_MS, MIN_FRAME_RATE, NSEC_PER_MSEC, NSEC_PER_SEC,
};
