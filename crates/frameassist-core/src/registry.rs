//! Group registry and thread directory.
//!
//! Groups are created on first attach and live until the registry is dropped.
//! The registry lock is reader-biased: lookups dominate (every tick resolves
//! a thread), creation is rare. The thread directory resolves the non-owning
//! thread ids held by member entries back to their group.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::MAX_GROUP_ID;
use crate::error::{FrameSchedError, FrameSchedResult};
use crate::group::{Group, GroupId, ThreadId};

/// Owner of all groups plus the thread-to-group directory.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<GroupId, Arc<Group>>>,
    directory: RwLock<HashMap<ThreadId, GroupId>>,
}

impl GroupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<Arc<Group>> {
        self.groups.read().get(&id).cloned()
    }

    /// Look up a group, materializing it if the id is in range.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for ids outside `[1, MAX_GROUP_ID]`.
    pub fn ensure_group(&self, id: GroupId, now_ns: u64) -> FrameSchedResult<Arc<Group>> {
        if id.0 == 0 || id.0 > MAX_GROUP_ID {
            return Err(FrameSchedError::group_not_found(id));
        }
        if let Some(group) = self.groups.read().get(&id) {
            return Ok(Arc::clone(group));
        }
        let mut groups = self.groups.write();
        let group = groups
            .entry(id)
            .or_insert_with(|| Arc::new(Group::new(id, now_ns)));
        Ok(Arc::clone(group))
    }

    /// Attach a thread to a group, creating the group on first use.
    ///
    /// Attaching an already-attached thread to the same group is a no-op; a
    /// thread attached elsewhere moves to the new group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for ids outside the materializable range.
    pub fn attach(&self, thread: ThreadId, id: GroupId, now_ns: u64) -> FrameSchedResult<()> {
        let group = self.ensure_group(id, now_ns)?;

        let mut directory = self.directory.write();
        match directory.get(&thread) {
            Some(current) if *current == id => {
                tracing::debug!(%thread, %id, "attach is a no-op, already a member");
                return Ok(());
            }
            Some(current) => {
                // Move semantics: leave the old group first.
                if let Some(old) = self.groups.read().get(current).cloned() {
                    old.detach(thread);
                }
            }
            None => {}
        }
        group.attach(thread);
        directory.insert(thread, id);
        tracing::debug!(%thread, %id, "thread attached");
        Ok(())
    }

    /// Detach a thread from its group.
    ///
    /// # Errors
    ///
    /// Returns `ThreadNotFound` if the thread is not attached anywhere; the
    /// membership list is left untouched in that case.
    pub fn detach(&self, thread: ThreadId) -> FrameSchedResult<Arc<Group>> {
        let mut directory = self.directory.write();
        let id = directory
            .get(&thread)
            .copied()
            .ok_or(FrameSchedError::thread_not_found(thread))?;
        let group = self
            .groups
            .read()
            .get(&id)
            .cloned()
            .ok_or(FrameSchedError::group_not_found(id))?;
        group.detach(thread);
        directory.remove(&thread);
        tracing::debug!(%thread, %id, "thread detached");
        Ok(group)
    }

    /// Resolve the group a thread is attached to.
    #[must_use]
    pub fn group_of(&self, thread: ThreadId) -> Option<Arc<Group>> {
        let id = *self.directory.read().get(&thread)?;
        self.group(id)
    }

    /// Number of materialized groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }

    /// Run `f` for every materialized group.
    pub fn for_each_group(&self, mut f: impl FnMut(&Arc<Group>)) {
        for group in self.groups.read().values() {
            f(group);
        }
    }
}
