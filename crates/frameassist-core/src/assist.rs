//! The scheduling assistant: control plane plus tick path.
//!
//! `SchedulerAssistant` is an explicitly constructed, explicitly owned
//! context; every API entry point takes it by reference and its lifecycle is
//! controlled by the hosting process. Three call contexts touch its shared
//! state: per-CPU scheduler ticks ([`SchedulerAssistant::account_tick`],
//! non-blocking, O(member count)), control-plane calls (may block briefly on
//! a per-group lock, never on I/O), and boost-expiry callbacks (fired from
//! whichever CPU polls the wheel next).

use std::sync::Arc;

use crate::boost::BoostTimer;
use crate::cluster::ClusterSelector;
use crate::error::{FrameSchedError, FrameSchedResult};
use crate::frame::{BoundaryFlags, BoundaryKind, FrameStatus};
use crate::freq::FrequencyHintEmitter;
use crate::group::{Group, GroupId, ThreadId};
use crate::policy::{BoostPolicy, Clock, FrequencyGovernor, MonotonicClock};
use crate::registry::GroupRegistry;
use crate::topology::CpuTopology;
use crate::{CAPACITY_SCALE, NSEC_PER_MSEC, UTIL_INVALID_FACTOR};

/// Builder for [`SchedulerAssistant`].
#[derive(Default)]
pub struct SchedulerAssistantBuilder {
    clock: Option<Arc<dyn Clock>>,
    topology: Option<CpuTopology>,
    governor: Option<Arc<dyn FrequencyGovernor>>,
    policy: Option<Arc<dyn BoostPolicy>>,
    force_max_cluster_on_boost: bool,
}

impl SchedulerAssistantBuilder {
    /// Inject a time source (defaults to [`MonotonicClock`]).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the CPU topology (required).
    #[must_use]
    pub fn topology(mut self, topology: CpuTopology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Set the frequency governor hook (required).
    #[must_use]
    pub fn governor(mut self, governor: Arc<dyn FrequencyGovernor>) -> Self {
        self.governor = Some(governor);
        self
    }

    /// Set the placement boost policy (required).
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn BoostPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Route every group with an active boost to the maximum-capacity
    /// cluster regardless of its utilization.
    #[must_use]
    pub fn force_max_cluster_on_boost(mut self, force: bool) -> Self {
        self.force_max_cluster_on_boost = force;
        self
    }

    /// Build the assistant.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a required collaborator is missing.
    pub fn build(self) -> FrameSchedResult<SchedulerAssistant> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let topology = self
            .topology
            .ok_or_else(|| FrameSchedError::internal("topology not configured"))?;
        let governor = self
            .governor
            .ok_or_else(|| FrameSchedError::internal("frequency governor not configured"))?;
        let policy = self
            .policy
            .ok_or_else(|| FrameSchedError::internal("boost policy not configured"))?;

        let registry = Arc::new(GroupRegistry::new());
        let wheel_registry = Arc::clone(&registry);
        let wheel_clock = Arc::clone(&clock);
        let wheel = BoostTimer::new(Box::new(move |group_id| {
            expire_boost(&wheel_registry, &wheel_clock, group_id);
        }));

        Ok(SchedulerAssistant {
            clock,
            registry,
            selector: ClusterSelector::new(topology, policy),
            emitter: FrequencyHintEmitter::new(governor),
            wheel,
            force_max_cluster_on_boost: self.force_max_cluster_on_boost,
        })
    }
}

/// Boost-expiry path: clear the floor and, when tracking was active only for
/// the boost's sake, stop it entirely.
fn expire_boost(registry: &GroupRegistry, clock: &Arc<dyn Clock>, group_id: GroupId) {
    let Some(group) = registry.group(group_id) else {
        return;
    };
    let mut rt = group.rt.lock();
    rt.frame.set_boost_floor(0);
    if rt.boost_only {
        rt.boost_only = false;
        rt.enabled = false;
        rt.frame.reset();
        rt.window.reset(clock.now_ns());
        tracing::debug!(%group_id, "boost expired, frame tracking stopped");
    } else {
        tracing::debug!(%group_id, "boost expired");
    }
    drop(rt);
    group.meta.lock().max_boost = 0;
}

/// Frame-deadline-aware scheduling assistant.
pub struct SchedulerAssistant {
    clock: Arc<dyn Clock>,
    registry: Arc<GroupRegistry>,
    selector: ClusterSelector,
    emitter: FrequencyHintEmitter,
    wheel: BoostTimer,
    force_max_cluster_on_boost: bool,
}

impl SchedulerAssistant {
    /// Start building an assistant.
    #[must_use]
    pub fn builder() -> SchedulerAssistantBuilder {
        SchedulerAssistantBuilder::default()
    }

    /// The group registry (shared with expiry callbacks).
    #[must_use]
    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    /// Attach a thread to a group, materializing the group on first use.
    ///
    /// Idempotent: attaching an already-attached thread is a no-op. If frame
    /// scheduling is active the new member's window counters start
    /// accumulating on its next tick.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for group ids outside the accepted range.
    pub fn attach_thread(&self, thread: ThreadId, group: GroupId) -> FrameSchedResult<()> {
        self.registry.attach(thread, group, self.clock.now_ns())
    }

    /// Detach a thread from its group.
    ///
    /// # Errors
    ///
    /// Returns `ThreadNotFound` for threads not attached anywhere.
    pub fn detach_thread(&self, thread: ThreadId) -> FrameSchedResult<()> {
        let group = self.registry.detach(thread)?;
        if group.member_count() == 0 {
            tracing::debug!(group = %group.id(), "last member detached, tracking paused");
        }
        Ok(())
    }

    /// Set a group's frame rate in frames per second.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` for unknown groups, `InvalidArgument` for rates
    /// outside `[1, 120]`; a rejected call leaves the previous configuration
    /// in effect.
    pub fn set_frame_rate(&self, group: GroupId, fps: u32) -> FrameSchedResult<()> {
        let group = self.group(group)?;
        let mut rt = group.rt.lock();
        rt.frame.set_frame_rate(fps)
    }

    /// Set a group's virtual-load margin in milliseconds.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` or `InvalidArgument` (margin outside ±100ms).
    pub fn set_frame_margin(&self, group: GroupId, margin_ms: i64) -> FrameSchedResult<()> {
        let group = self.group(group)?;
        let mut rt = group.rt.lock();
        rt.frame.set_frame_margin(margin_ms)
    }

    /// Set a group's minimum utilization, or its boost floor when
    /// `is_boost`.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` or `InvalidArgument`.
    pub fn set_frame_min_util(
        &self,
        group: GroupId,
        util: u64,
        is_boost: bool,
    ) -> FrameSchedResult<()> {
        let group = self.group(group)?;
        let mut rt = group.rt.lock();
        rt.frame.set_min_util(util, is_boost)
    }

    /// Set a group's maximum utilization.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` or `InvalidArgument`.
    pub fn set_frame_max_util(&self, group: GroupId, util: u64) -> FrameSchedResult<()> {
        let group = self.group(group)?;
        let mut rt = group.rt.lock();
        rt.frame.set_max_util(util)
    }

    /// Set the lower bound applied to previous-load snapshots.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` or `InvalidArgument`.
    pub fn set_frame_min_prev_util(&self, group: GroupId, util: u64) -> FrameSchedResult<()> {
        let group = self.group(group)?;
        let mut rt = group.rt.lock();
        rt.frame.set_prev_min_util(util)
    }

    /// Set the upper bound applied to previous-load snapshots.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` or `InvalidArgument`.
    pub fn set_frame_max_prev_util(&self, group: GroupId, util: u64) -> FrameSchedResult<()> {
        let group = self.group(group)?;
        let mut rt = group.rt.lock();
        rt.frame.set_prev_max_util(util)
    }

    /// Turn frame tracking on for a group, materializing it if needed.
    /// Redundant enables succeed.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` for ids outside the accepted range.
    pub fn enable_frame_scheduling(&self, group: GroupId) -> FrameSchedResult<()> {
        let now = self.clock.now_ns();
        let group = self.registry.ensure_group(group, now)?;
        let mut rt = group.rt.lock();
        if rt.enabled {
            tracing::debug!(group = %group.id(), "frame scheduling already enabled");
            return Ok(());
        }
        rt.enabled = true;
        rt.boost_only = false;
        rt.window.reset(now);
        tracing::debug!(group = %group.id(), "frame scheduling enabled");
        Ok(())
    }

    /// Turn frame tracking off and reset the group's frame state to
    /// defaults. Redundant disables succeed.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` for unknown groups.
    pub fn disable_frame_scheduling(&self, group_id: GroupId) -> FrameSchedResult<()> {
        let group = self.group(group_id)?;
        self.wheel.cancel(group_id);
        let now = self.clock.now_ns();
        let mut rt = group.rt.lock();
        if !rt.enabled {
            tracing::debug!(%group_id, "frame scheduling already disabled");
            return Ok(());
        }
        rt.enabled = false;
        rt.boost_only = false;
        rt.frame.reset();
        rt.window.reset(now);
        drop(rt);
        group.meta.lock().max_boost = 0;
        tracing::debug!(%group_id, "frame scheduling disabled");
        Ok(())
    }

    /// Signal a frame boundary for a group.
    ///
    /// The window rollover and the paired status transition happen under one
    /// lock, so a concurrent tick never observes rolled counters with a
    /// stale status or vice versa. Boundaries for groups with tracking
    /// disabled are ignored.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` for unknown groups.
    pub fn signal_frame_boundary(
        &self,
        group_id: GroupId,
        kind: BoundaryKind,
        flags: BoundaryFlags,
    ) -> FrameSchedResult<()> {
        let group = self.group(group_id)?;
        let now = self.clock.now_ns();

        let refresh = {
            let mut rt = group.rt.lock();
            if !rt.enabled {
                tracing::debug!(%group_id, "boundary ignored, tracking disabled");
                return Ok(());
            }
            match kind {
                BoundaryKind::Start => {
                    if flags.skip_start {
                        rt.frame.set_timestamp_skipped(true);
                    } else {
                        rt.roll_window(now);
                        rt.frame.set_timestamp_skipped(false);
                    }
                    rt.frame.begin_frame(flags.margin_immediate);
                }
                BoundaryKind::End => {
                    if rt.frame.status() != FrameStatus::Start {
                        tracing::debug!(%group_id, "frame end without open frame, ignoring");
                        return Ok(());
                    }
                    if flags.skip_end {
                        rt.frame.set_timestamp_skipped(true);
                    } else {
                        rt.roll_window(now);
                        rt.frame.set_timestamp_skipped(false);
                    }
                    rt.frame.end_frame();
                }
            }
            PlacementInputs::capture(&rt.frame)
        };
        self.refresh_placement(&group, refresh, now);
        Ok(())
    }

    /// Start (or extend) a timed utilization-floor boost for a group.
    ///
    /// Arming never shortens an existing farther-out deadline. A group whose
    /// tracking was off is switched on in boost-only mode; expiry switches
    /// it back off.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` or `InvalidArgument` (zero duration, floor above
    /// `CAPACITY_SCALE`).
    pub fn start_boost(
        &self,
        group_id: GroupId,
        duration_ms: u64,
        floor_util: u64,
    ) -> FrameSchedResult<()> {
        if duration_ms == 0 {
            return Err(FrameSchedError::invalid_argument("boost duration is zero"));
        }
        if floor_util > CAPACITY_SCALE {
            return Err(FrameSchedError::invalid_argument(format!(
                "boost floor {floor_util} above {CAPACITY_SCALE}"
            )));
        }
        let now = self.clock.now_ns();
        let group = self.registry.ensure_group(group_id, now)?;
        let deadline = now.saturating_add(duration_ms.saturating_mul(NSEC_PER_MSEC));

        // Arming and the floor write share the `rt` critical section; an
        // expiry fired by a concurrent poll blocks on `rt` until both are
        // done, so it can never clear a floor that was not yet applied.
        let mut rt = group.rt.lock();
        if !self.wheel.arm(group_id, deadline, floor_util) {
            return Ok(());
        }
        rt.frame.set_boost_floor(floor_util);
        if !rt.enabled {
            rt.enabled = true;
            rt.boost_only = true;
            rt.window.reset(now);
        }
        drop(rt);
        group.meta.lock().max_boost = 1;
        Ok(())
    }

    /// Cancel a pending boost and clear its floor.
    ///
    /// Blocks until any in-flight expiry callback for the group has
    /// finished, so no stale floor write can occur after this returns.
    /// Stopping a group with no boost pending succeeds.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` for unknown groups.
    pub fn stop_boost(&self, group_id: GroupId) -> FrameSchedResult<()> {
        let group = self.group(group_id)?;
        self.wheel.cancel(group_id);
        let now = self.clock.now_ns();
        let mut rt = group.rt.lock();
        rt.frame.set_boost_floor(0);
        if rt.boost_only {
            rt.boost_only = false;
            rt.enabled = false;
            rt.frame.reset();
            rt.window.reset(now);
        }
        drop(rt);
        group.meta.lock().max_boost = 0;
        Ok(())
    }

    /// Scheduler-tick entry: account `exec_delta_ns`/`load_delta` for a
    /// thread and drive the frame state machine.
    ///
    /// Never surfaces errors — tick context has no means to handle them;
    /// unknown threads are logged at trace level and dropped.
    pub fn account_tick(&self, thread: ThreadId, exec_delta_ns: u64, load_delta: u64) {
        let now = self.clock.now_ns();
        self.wheel.poll(now);

        let Some(group) = self.registry.group_of(thread) else {
            tracing::trace!(%thread, "tick for unattached thread ignored");
            return;
        };

        let refresh = {
            let mut rt = group.rt.lock();
            if !rt.enabled {
                return;
            }
            if let Some(member) = rt.member_mut(thread) {
                member.curr_exec_ns = member.curr_exec_ns.saturating_add(exec_delta_ns);
                member.curr_load = member.curr_load.saturating_add(load_delta);
            }
            rt.window.account(exec_delta_ns, load_delta);

            if rt.frame.status() == FrameStatus::Start {
                let elapsed = rt.window.elapsed_ns(now);
                let stale = elapsed >= rt.frame.util_invalid_interval_ns()
                    && rt.window.curr_exec_ns.saturating_mul(UTIL_INVALID_FACTOR) <= elapsed;
                if stale {
                    // Rollover and status transition under one lock: never
                    // independently observable.
                    rt.roll_window(now);
                    rt.frame.mark_invalid();
                    tracing::warn!(
                        group = %group.id(),
                        elapsed_ns = elapsed,
                        "window went stale without progress, forced invalid"
                    );
                } else {
                    let vtime_ms = (elapsed / NSEC_PER_MSEC) as i64;
                    rt.frame.update_vload(vtime_ms);
                }
            }
            PlacementInputs::capture(&rt.frame)
        };
        self.refresh_placement(&group, refresh, now);
    }

    /// Current utilization hint for a group (observability only).
    ///
    /// # Errors
    ///
    /// `GroupNotFound` for unknown groups.
    pub fn query_group_util(&self, group: GroupId) -> FrameSchedResult<u64> {
        Ok(self.group(group)?.frame_util())
    }

    /// Whether a boost is currently pending for a group.
    #[must_use]
    pub fn boost_pending(&self, group: GroupId) -> bool {
        self.wheel.is_armed(group)
    }

    fn group(&self, id: GroupId) -> FrameSchedResult<Arc<Group>> {
        self.registry
            .group(id)
            .ok_or(FrameSchedError::group_not_found(id))
    }

    /// Re-evaluate the preferred cluster and notify the governor. A cluster
    /// change refreshes both the old and the new cluster's representative
    /// CPU immediately; otherwise the notification is rate-limited.
    fn refresh_placement(&self, group: &Arc<Group>, inputs: PlacementInputs, now_ns: u64) {
        let force_max = inputs.boost_active && self.force_max_cluster_on_boost;
        let mut meta = group.meta.lock();
        let Some(cluster) = self
            .selector
            .best_cluster(inputs.util, meta.max_boost, force_max)
        else {
            return;
        };
        let cluster_id = cluster.id;

        if meta.preferred_cluster != Some(cluster_id) {
            let old = meta
                .preferred_cluster
                .and_then(|id| self.selector.topology().cluster(id))
                .and_then(|c| c.representative_cpu());
            meta.preferred_cluster = Some(cluster_id);
            if let Some(old_cpu) = old {
                self.emitter.push(
                    old_cpu,
                    now_ns,
                    &mut meta.last_freq_update_ns,
                    inputs.interval_ns,
                    true,
                );
            }
            if let Some(cpu) = cluster.representative_cpu() {
                self.emitter.push(
                    cpu,
                    now_ns,
                    &mut meta.last_freq_update_ns,
                    inputs.interval_ns,
                    true,
                );
            }
            tracing::debug!(group = %group.id(), %cluster_id, "preferred cluster changed");
        } else if let Some(cpu) = cluster.representative_cpu() {
            self.emitter.push(
                cpu,
                now_ns,
                &mut meta.last_freq_update_ns,
                inputs.interval_ns,
                false,
            );
        }
    }
}

/// Snapshot of the frame fields the placement path needs, captured under the
/// `rt` lock and consumed after it is released.
#[derive(Debug, Clone, Copy)]
struct PlacementInputs {
    util: u64,
    interval_ns: u64,
    boost_active: bool,
}

impl PlacementInputs {
    fn capture(frame: &crate::frame::FrameInfo) -> Self {
        Self {
            util: frame.frame_util(),
            interval_ns: frame.freq_update_interval_ns(),
            boost_active: frame.boost_min_util() > 0,
        }
    }
}

impl std::fmt::Debug for SchedulerAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerAssistant")
            .field("groups", &self.registry.group_count())
            .field("wheel", &self.wheel)
            .field("force_max_cluster_on_boost", &self.force_max_cluster_on_boost)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Cluster, ClusterId, CpuId};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct TestClock(AtomicU64);

    impl Clock for TestClock {
        fn now_ns(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct NullGovernor {
        calls: Mutex<Vec<(CpuId, bool)>>,
    }

    impl FrequencyGovernor for NullGovernor {
        fn request_update(&self, cpu: CpuId, immediate: bool) {
            self.calls.lock().push((cpu, immediate));
        }
    }

    struct NoMargin;

    impl BoostPolicy for NoMargin {
        fn boost_margin(&self, _util: u64, _boost_level: u32) -> u64 {
            0
        }
    }

    fn assistant() -> (Arc<TestClock>, Arc<NullGovernor>, SchedulerAssistant) {
        let clock = Arc::new(TestClock(AtomicU64::new(0)));
        let governor = Arc::new(NullGovernor::default());
        let topology = CpuTopology::new(vec![
            Cluster::new(ClusterId(0), 512, vec![CpuId(0), CpuId(1)]),
            Cluster::new(ClusterId(1), 1024, vec![CpuId(2), CpuId(3)]),
        ])
        .unwrap();
        let assist = SchedulerAssistant::builder()
            .clock(Arc::<TestClock>::clone(&clock))
            .topology(topology)
            .governor(Arc::<NullGovernor>::clone(&governor))
            .policy(Arc::new(NoMargin))
            .build()
            .unwrap();
        (clock, governor, assist)
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = SchedulerAssistant::builder().build().unwrap_err();
        assert!(matches!(err, FrameSchedError::Internal(_)));
    }

    #[test]
    fn test_setters_require_existing_group() {
        let (_, _, assist) = assistant();
        assert!(matches!(
            assist.set_frame_rate(GroupId(1), 60),
            Err(FrameSchedError::GroupNotFound(_))
        ));
        assist.attach_thread(ThreadId(1), GroupId(1)).unwrap();
        assert!(assist.set_frame_rate(GroupId(1), 60).is_ok());
    }

    #[test]
    fn test_boost_only_group_stops_on_stop_boost() {
        let (clock, _, assist) = assistant();
        clock.0.store(1_000, Ordering::SeqCst);
        assist.start_boost(GroupId(2), 50, 300).unwrap();
        assert_eq!(assist.query_group_util(GroupId(2)).unwrap(), 300);
        assert!(assist.boost_pending(GroupId(2)));

        assist.stop_boost(GroupId(2)).unwrap();
        assert!(!assist.boost_pending(GroupId(2)));
        assert_eq!(assist.query_group_util(GroupId(2)).unwrap(), 0);
    }

    #[test]
    fn test_cluster_change_refreshes_both_clusters() {
        let (clock, governor, assist) = assistant();
        assist.attach_thread(ThreadId(7), GroupId(1)).unwrap();
        assist.enable_frame_scheduling(GroupId(1)).unwrap();
        assist.set_frame_rate(GroupId(1), 60).unwrap();
        assist
            .signal_frame_boundary(GroupId(1), BoundaryKind::Start, BoundaryFlags::default())
            .unwrap();
        governor.calls.lock().clear();

        // Saturate the vload so the big cluster is required.
        clock.0.store(40 * NSEC_PER_MSEC, Ordering::SeqCst);
        assist.account_tick(ThreadId(7), 39 * NSEC_PER_MSEC, 39 * NSEC_PER_MSEC);

        let calls = governor.calls.lock();
        let immediate: Vec<_> = calls.iter().filter(|(_, i)| *i).collect();
        assert!(
            immediate.iter().any(|(cpu, _)| *cpu == CpuId(2)),
            "new cluster not refreshed: {calls:?}"
        );
    }
}
