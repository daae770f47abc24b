//! Preferred-cluster selection.

use std::sync::Arc;

use crate::policy::BoostPolicy;
use crate::topology::{Cluster, CpuTopology};

/// Maps a group's required utilization to the smallest cluster able to
/// carry it.
pub struct ClusterSelector {
    topology: CpuTopology,
    policy: Arc<dyn BoostPolicy>,
}

impl ClusterSelector {
    /// Create a selector over a validated topology.
    pub fn new(topology: CpuTopology, policy: Arc<dyn BoostPolicy>) -> Self {
        Self { topology, policy }
    }

    /// The topology this selector scans.
    #[must_use]
    pub fn topology(&self) -> &CpuTopology {
        &self.topology
    }

    /// Smallest cluster whose capacity covers `util` plus the policy's boost
    /// margin; the maximum-capacity cluster when none qualifies or when
    /// `force_max` is set.
    #[must_use]
    pub fn best_cluster(&self, util: u64, boost_level: u32, force_max: bool) -> Option<&Cluster> {
        if force_max {
            return self.topology.max_capacity_cluster();
        }
        let boosted = util.saturating_add(self.policy.boost_margin(util, boost_level));
        self.topology
            .clusters()
            .iter()
            .find(|c| c.capacity >= boosted)
            .or_else(|| self.topology.max_capacity_cluster())
    }
}

impl std::fmt::Debug for ClusterSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSelector")
            .field("clusters", &self.topology.clusters().len())
            .finish()
    }
}
