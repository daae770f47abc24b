//! Per-group load-window accounting.
//!
//! One window spans the interval between two rollovers. The tracker keeps the
//! current window's accumulated load and executed time next to the previous
//! window's, so the frame state machine can snapshot "what the group did last
//! frame" at every boundary.

/// Current/previous window counters for one group.
#[derive(Debug, Clone, Default)]
pub struct WindowTracker {
    /// Timestamp of the last rollover.
    pub window_start_ns: u64,
    /// Load accumulated in the current window.
    pub curr_load: u64,
    /// Executed time accumulated in the current window, in nanoseconds.
    pub curr_exec_ns: u64,
    /// Load of the previous window.
    pub prev_load: u64,
    /// Executed time of the previous window, in nanoseconds.
    pub prev_exec_ns: u64,
}

impl WindowTracker {
    /// Create a tracker whose first window opens at `now_ns`.
    #[must_use]
    pub fn new(now_ns: u64) -> Self {
        Self {
            window_start_ns: now_ns,
            ..Self::default()
        }
    }

    /// Account executed time and load into the current window.
    pub fn account(&mut self, exec_delta_ns: u64, load_delta: u64) {
        self.curr_exec_ns = self.curr_exec_ns.saturating_add(exec_delta_ns);
        self.curr_load = self.curr_load.saturating_add(load_delta);
    }

    /// Wall time the current window has been open.
    #[must_use]
    pub fn elapsed_ns(&self, now_ns: u64) -> u64 {
        now_ns.saturating_sub(self.window_start_ns)
    }

    /// Roll the window: current counters become previous, current resets, the
    /// window reopens at `now_ns`.
    ///
    /// A second request at (or before) the timestamp of the last rollover is a
    /// no-op, so two signals landing on the same tick roll at most once.
    /// Returns whether the window actually rolled.
    pub fn rollover(&mut self, now_ns: u64) -> bool {
        if now_ns <= self.window_start_ns {
            return false;
        }
        self.prev_load = self.curr_load;
        self.prev_exec_ns = self.curr_exec_ns;
        self.curr_load = 0;
        self.curr_exec_ns = 0;
        self.window_start_ns = now_ns;
        true
    }

    /// Clear all counters and reopen the window at `now_ns`.
    pub fn reset(&mut self, now_ns: u64) {
        *self = Self::new(now_ns);
    }
}
