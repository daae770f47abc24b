//! CPU topology described as an explicit ordered list of cluster descriptors.
//!
//! Clusters are kept sorted by ascending capacity so the selector can return
//! the first (smallest) cluster able to satisfy a demand.

use std::fmt;

use crate::CAPACITY_SCALE;
use crate::error::{FrameSchedError, FrameSchedResult};

/// Identifier of a logical CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuId(pub u32);

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Identifier of a capacity tier (cluster).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster{}", self.0)
    }
}

/// A set of CPUs sharing one capacity tier.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Cluster identifier.
    pub id: ClusterId,
    /// Capacity of each member CPU, in `[1, CAPACITY_SCALE]`.
    pub capacity: u64,
    /// Member CPUs; never empty after topology validation.
    pub cpus: Vec<CpuId>,
}

impl Cluster {
    /// Create a cluster descriptor.
    #[must_use]
    pub fn new(id: ClusterId, capacity: u64, cpus: Vec<CpuId>) -> Self {
        Self { id, capacity, cpus }
    }

    /// The CPU used when notifying the governor about this cluster.
    #[must_use]
    pub fn representative_cpu(&self) -> Option<CpuId> {
        self.cpus.first().copied()
    }
}

/// Validated, capacity-ordered list of clusters.
#[derive(Debug, Clone)]
pub struct CpuTopology {
    clusters: Vec<Cluster>,
}

impl CpuTopology {
    /// Build a topology from cluster descriptors.
    ///
    /// # Errors
    ///
    /// Rejects an empty list, empty clusters, duplicate CPU or cluster ids,
    /// and capacities outside `[1, CAPACITY_SCALE]`.
    pub fn new(mut clusters: Vec<Cluster>) -> FrameSchedResult<Self> {
        if clusters.is_empty() {
            return Err(FrameSchedError::invalid_argument(
                "topology must contain at least one cluster",
            ));
        }

        let mut seen_cpus = std::collections::HashSet::new();
        let mut seen_clusters = std::collections::HashSet::new();
        for cluster in &clusters {
            if cluster.cpus.is_empty() {
                return Err(FrameSchedError::invalid_argument(format!(
                    "{} has no member CPUs",
                    cluster.id
                )));
            }
            if cluster.capacity == 0 || cluster.capacity > CAPACITY_SCALE {
                return Err(FrameSchedError::invalid_argument(format!(
                    "{} capacity {} outside [1, {CAPACITY_SCALE}]",
                    cluster.id, cluster.capacity
                )));
            }
            if !seen_clusters.insert(cluster.id) {
                return Err(FrameSchedError::invalid_argument(format!(
                    "duplicate {}",
                    cluster.id
                )));
            }
            for cpu in &cluster.cpus {
                if !seen_cpus.insert(*cpu) {
                    return Err(FrameSchedError::invalid_argument(format!(
                        "duplicate {cpu}"
                    )));
                }
            }
        }

        clusters.sort_by_key(|c| c.capacity);
        Ok(Self { clusters })
    }

    /// Clusters in ascending capacity order.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Look up a cluster by id.
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// The cluster containing `cpu`.
    #[must_use]
    pub fn cluster_of(&self, cpu: CpuId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.cpus.contains(&cpu))
    }

    /// Capacity of the cluster containing `cpu`.
    #[must_use]
    pub fn capacity_of(&self, cpu: CpuId) -> Option<u64> {
        self.cluster_of(cpu).map(|c| c.capacity)
    }

    /// The highest-capacity cluster.
    #[must_use]
    pub fn max_capacity_cluster(&self) -> Option<&Cluster> {
        self.clusters.last()
    }
}
