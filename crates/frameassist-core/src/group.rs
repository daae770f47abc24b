//! Related thread groups.
//!
//! A group owns its member entries; each entry holds a non-owning thread id
//! (resolved through the registry's thread directory) plus the thread's
//! current/previous window counters. Group state is split across two locks:
//! `rt` covers everything the scheduler-tick path touches (members, window
//! counters, frame state, mode flags), `meta` covers the placement and
//! rate-limiting fields. Lock order is `rt` before `meta`; neither is ever
//! held across blocking I/O.

use std::fmt;

use parking_lot::Mutex;

use crate::frame::FrameInfo;
use crate::topology::ClusterId;
use crate::window::WindowTracker;

/// Identifier of a related thread group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group{}", self.0)
    }
}

/// Identifier of a thread, owned elsewhere; groups only hold this weak id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread{}", self.0)
    }
}

/// Per-thread window counters, owned by the group.
#[derive(Debug, Clone)]
pub struct MemberEntry {
    /// Non-owning reference to the thread.
    pub thread: ThreadId,
    /// Load accumulated by this thread in the current window.
    pub curr_load: u64,
    /// Executed time accumulated by this thread in the current window.
    pub curr_exec_ns: u64,
    /// Load of the previous window.
    pub prev_load: u64,
    /// Executed time of the previous window.
    pub prev_exec_ns: u64,
}

impl MemberEntry {
    fn new(thread: ThreadId) -> Self {
        Self {
            thread,
            curr_load: 0,
            curr_exec_ns: 0,
            prev_load: 0,
            prev_exec_ns: 0,
        }
    }

    fn rollover(&mut self) {
        self.prev_load = self.curr_load;
        self.prev_exec_ns = self.curr_exec_ns;
        self.curr_load = 0;
        self.curr_exec_ns = 0;
    }
}

/// Fields touched by the scheduler-tick path.
#[derive(Debug)]
pub(crate) struct GroupRt {
    pub members: Vec<MemberEntry>,
    pub window: WindowTracker,
    pub frame: FrameInfo,
    /// Frame tracking is active for this group.
    pub enabled: bool,
    /// Tracking is active only because of a boost; expiry stops it.
    pub boost_only: bool,
}

/// Placement and rate-limiting fields, off the hot path.
#[derive(Debug, Default)]
pub(crate) struct GroupMeta {
    pub preferred_cluster: Option<ClusterId>,
    pub last_freq_update_ns: u64,
    pub max_boost: u32,
}

/// One related thread group. Created on first attach, destroyed only at
/// registry teardown.
pub struct Group {
    id: GroupId,
    pub(crate) rt: Mutex<GroupRt>,
    pub(crate) meta: Mutex<GroupMeta>,
}

impl Group {
    pub(crate) fn new(id: GroupId, now_ns: u64) -> Self {
        Self {
            id,
            rt: Mutex::new(GroupRt {
                members: Vec::new(),
                window: WindowTracker::new(now_ns),
                frame: FrameInfo::new(),
                enabled: false,
                boost_only: false,
            }),
            meta: Mutex::new(GroupMeta::default()),
        }
    }

    /// Group identifier.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Add a member. Returns `false` (and changes nothing) if the thread is
    /// already a member.
    pub(crate) fn attach(&self, thread: ThreadId) -> bool {
        let mut rt = self.rt.lock();
        if rt.members.iter().any(|m| m.thread == thread) {
            return false;
        }
        rt.members.push(MemberEntry::new(thread));
        true
    }

    /// Remove a member. Returns `false` if the thread was not a member.
    pub(crate) fn detach(&self, thread: ThreadId) -> bool {
        let mut rt = self.rt.lock();
        let before = rt.members.len();
        rt.members.retain(|m| m.thread != thread);
        rt.members.len() != before
    }

    /// Number of attached threads.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.rt.lock().members.len()
    }

    /// Current utilization hint.
    #[must_use]
    pub fn frame_util(&self) -> u64 {
        self.rt.lock().frame.frame_util()
    }
}

impl GroupRt {
    /// Roll the group window together with every member's counters and hand
    /// the closed window to the frame state. Runs under the `rt` lock, so the
    /// rollover and any paired status transition are observed atomically.
    ///
    /// Returns `false` when the window already rolled this tick.
    pub(crate) fn roll_window(&mut self, now_ns: u64) -> bool {
        let elapsed = self.window.elapsed_ns(now_ns);
        if !self.window.rollover(now_ns) {
            return false;
        }
        for member in &mut self.members {
            member.rollover();
        }
        self.frame
            .note_window(self.window.prev_load, self.window.prev_exec_ns, elapsed);
        true
    }

    pub(crate) fn member_mut(&mut self, thread: ThreadId) -> Option<&mut MemberEntry> {
        self.members.iter_mut().find(|m| m.thread == thread)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rt = self.rt.lock();
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("members", &rt.members.len())
            .field("status", &rt.frame.status())
            .field("enabled", &rt.enabled)
            .finish()
    }
}
