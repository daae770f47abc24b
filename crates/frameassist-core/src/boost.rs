//! One-shot boost timer wheel.
//!
//! One wheel serves every group. Commands are `arm` and `cancel`; expiry is
//! driven by `poll`, which tick paths call with the current timestamp, so
//! expiry callbacks run on whichever CPU ticks next and race with both
//! control-plane calls and other ticks.
//!
//! Invariants:
//! - at most one pending expiry per group;
//! - arming never shortens an existing farther-out deadline;
//! - `cancel` returns only after any in-flight expiry callback for that group
//!   has finished, so no stale floor write can land afterwards.

use std::collections::HashMap;

use parking_lot::{Condvar, Mutex};

use crate::group::GroupId;

/// Callback invoked when a boost deadline expires.
pub type ExpiryCallback = Box<dyn Fn(GroupId) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct BoostEntry {
    deadline_ns: u64,
    floor_util: u64,
}

#[derive(Default)]
struct WheelState {
    entries: HashMap<GroupId, BoostEntry>,
    in_flight: Vec<GroupId>,
}

/// Timer wheel holding one pending boost expiry per group.
pub struct BoostTimer {
    state: Mutex<WheelState>,
    idle: Condvar,
    callback: ExpiryCallback,
}

impl BoostTimer {
    /// Create a wheel delivering expirations to `callback`.
    pub fn new(callback: ExpiryCallback) -> Self {
        Self {
            state: Mutex::new(WheelState::default()),
            idle: Condvar::new(),
            callback,
        }
    }

    /// Arm (or extend) the boost deadline for `group`.
    ///
    /// Monotonic-extension semantics: if a pending deadline is already
    /// farther out, the call is a complete no-op, the floor included.
    /// Returns whether the deadline and floor were applied.
    pub fn arm(&self, group: GroupId, deadline_ns: u64, floor_util: u64) -> bool {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get(&group) {
            if entry.deadline_ns >= deadline_ns {
                tracing::debug!(
                    %group,
                    pending_ns = entry.deadline_ns,
                    requested_ns = deadline_ns,
                    "boost already armed farther out, ignoring"
                );
                return false;
            }
        }
        state.entries.insert(
            group,
            BoostEntry {
                deadline_ns,
                floor_util,
            },
        );
        tracing::debug!(%group, deadline_ns, floor_util, "boost armed");
        true
    }

    /// Cancel the pending boost for `group`, then wait out any expiry
    /// callback already running for it.
    ///
    /// Returns whether a pending entry was removed.
    pub fn cancel(&self, group: GroupId) -> bool {
        let mut state = self.state.lock();
        let removed = state.entries.remove(&group).is_some();
        while state.in_flight.contains(&group) {
            self.idle.wait(&mut state);
        }
        removed
    }

    /// Fire every entry whose deadline has passed.
    ///
    /// Callbacks run outside the wheel lock; concurrent pollers never fire
    /// the same group twice because the due entry is removed and marked
    /// in-flight before the lock is released.
    pub fn poll(&self, now_ns: u64) {
        loop {
            let due = {
                let mut state = self.state.lock();
                let due = state
                    .entries
                    .iter()
                    .find(|(_, e)| e.deadline_ns <= now_ns)
                    .map(|(g, _)| *g);
                match due {
                    Some(group) => {
                        state.entries.remove(&group);
                        state.in_flight.push(group);
                        group
                    }
                    None => return,
                }
            };

            tracing::debug!(group = %due, "boost expired");
            (self.callback)(due);

            let mut state = self.state.lock();
            state.in_flight.retain(|g| *g != due);
            self.idle.notify_all();
        }
    }

    /// Whether a boost is pending for `group`.
    #[must_use]
    pub fn is_armed(&self, group: GroupId) -> bool {
        self.state.lock().entries.contains_key(&group)
    }

    /// Pending deadline for `group`, if armed.
    #[must_use]
    pub fn deadline_ns(&self, group: GroupId) -> Option<u64> {
        self.state.lock().entries.get(&group).map(|e| e.deadline_ns)
    }

    /// Floor applied by the pending boost for `group`, if armed.
    #[must_use]
    pub fn floor_util(&self, group: GroupId) -> Option<u64> {
        self.state.lock().entries.get(&group).map(|e| e.floor_util)
    }
}

impl std::fmt::Debug for BoostTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoostTimer")
            .field("pending", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}
