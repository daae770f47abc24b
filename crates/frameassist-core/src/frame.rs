//! Per-group frame state machine and virtual-load math.
//!
//! A frame is one periodic unit of work (for example one rendered display
//! frame). While a frame is open the virtual load ramps from zero toward
//! [`FRAME_MAX_VLOAD`] as the deadline approaches, independently of measured
//! executed time, so capacity is requested *before* the deadline is missed.
//!
//! The state machine has three states: `Start` (a frame is open), `End`
//! (idle, the initial state) and `Invalid` (the window outlived its staleness
//! bound without the group making progress). Allowed transitions are
//! Start→{Start, End, Invalid} and {End, Invalid}→Start.

use crate::{
    CAPACITY_SCALE, DEFAULT_FRAME_MARGIN_MS, DEFAULT_FRAME_RATE, FRAME_MAX_VLOAD,
    MAX_FRAME_MARGIN_MS, MAX_FRAME_RATE, MIN_FRAME_MARGIN_MS, MIN_FRAME_RATE, NSEC_PER_MSEC,
    NSEC_PER_SEC,
};
use crate::error::{FrameSchedError, FrameSchedResult};

/// State of the per-group frame machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame is open; ticks recompute the virtual load.
    Start,
    /// Idle between frames (initial state).
    End,
    /// The window went stale without progress; forced back through an
    /// End-style snapshot.
    Invalid,
}

/// Which boundary a frame signal marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// A frame begins.
    Start,
    /// A frame ends.
    End,
}

/// Modifiers accepted alongside a boundary signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryFlags {
    /// Do not roll the window on this start; the timing of the previous
    /// frame keeps accumulating until an unskipped boundary.
    pub skip_start: bool,
    /// Do not roll the window on this end.
    pub skip_end: bool,
    /// Recompute the virtual load immediately at frame start instead of
    /// resetting it to zero (matters when the margin drives
    /// `max_vload_time` non-positive).
    pub margin_immediate: bool,
}

/// Per-group deadline state and virtual-load computation.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    frame_rate: u32,
    frame_time_ns: u64,
    vload_margin_ms: i64,
    max_vload_time_ms: i64,
    util_invalid_interval_ns: u64,
    freq_update_interval_ns: u64,

    status: FrameStatus,

    frame_min_util: u64,
    frame_max_util: u64,
    boost_min_util: u64,
    prev_min_util: u64,
    prev_max_util: u64,

    prev_frame_load: u64,
    prev_frame_exec_ns: u64,
    prev_frame_time_ns: u64,
    prev_frame_load_util: u64,
    prev_fake_load_util: u64,
    snapshot_is_fake: bool,

    frame_vload: u64,
    frame_util: u64,

    margin_imme: bool,
    timestamp_skipped: bool,
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameInfo {
    /// Create frame state at the defaults (60 fps, idle).
    #[must_use]
    pub fn new() -> Self {
        let mut info = Self {
            frame_rate: DEFAULT_FRAME_RATE,
            frame_time_ns: 0,
            vload_margin_ms: DEFAULT_FRAME_MARGIN_MS,
            max_vload_time_ms: 0,
            util_invalid_interval_ns: 0,
            freq_update_interval_ns: 0,
            status: FrameStatus::End,
            frame_min_util: 0,
            frame_max_util: CAPACITY_SCALE,
            boost_min_util: 0,
            prev_min_util: 0,
            prev_max_util: CAPACITY_SCALE,
            prev_frame_load: 0,
            prev_frame_exec_ns: 0,
            prev_frame_time_ns: 0,
            prev_frame_load_util: 0,
            prev_fake_load_util: 0,
            snapshot_is_fake: false,
            frame_vload: 0,
            frame_util: 0,
            margin_imme: false,
            timestamp_skipped: false,
        };
        info.apply_rate(DEFAULT_FRAME_RATE);
        info
    }

    /// Raw rate plus every derived field, written together so a concurrent
    /// reader under the same lock never sees them disagree.
    fn apply_rate(&mut self, fps: u32) {
        self.frame_rate = fps;
        self.frame_time_ns = NSEC_PER_SEC / u64::from(fps);
        self.max_vload_time_ms = self.derive_max_vload_time();
        self.util_invalid_interval_ns = self.frame_time_ns.saturating_mul(2);
        self.freq_update_interval_ns = self.frame_time_ns / 2;
    }

    fn derive_max_vload_time(&self) -> i64 {
        let frame_time_ms = (self.frame_time_ns / NSEC_PER_MSEC) as i64;
        frame_time_ms + self.vload_margin_ms
    }

    /// Set the frame rate.
    ///
    /// # Errors
    ///
    /// Rejects rates outside `[MIN_FRAME_RATE, MAX_FRAME_RATE]` without
    /// touching any state.
    pub fn set_frame_rate(&mut self, fps: u32) -> FrameSchedResult<()> {
        if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&fps) {
            return Err(FrameSchedError::invalid_argument(format!(
                "frame rate {fps} outside [{MIN_FRAME_RATE}, {MAX_FRAME_RATE}]"
            )));
        }
        self.apply_rate(fps);
        Ok(())
    }

    /// Set the virtual-load margin in milliseconds.
    ///
    /// # Errors
    ///
    /// Rejects margins outside `[MIN_FRAME_MARGIN_MS, MAX_FRAME_MARGIN_MS]`.
    pub fn set_frame_margin(&mut self, margin_ms: i64) -> FrameSchedResult<()> {
        if !(MIN_FRAME_MARGIN_MS..=MAX_FRAME_MARGIN_MS).contains(&margin_ms) {
            return Err(FrameSchedError::invalid_argument(format!(
                "frame margin {margin_ms}ms outside [{MIN_FRAME_MARGIN_MS}, {MAX_FRAME_MARGIN_MS}]"
            )));
        }
        self.vload_margin_ms = margin_ms;
        self.max_vload_time_ms = self.derive_max_vload_time();
        Ok(())
    }

    /// Set the lower utilization bound, or the boost floor when `is_boost`.
    ///
    /// # Errors
    ///
    /// Rejects values above `CAPACITY_SCALE`, or above the current maximum
    /// for the non-boost bound.
    pub fn set_min_util(&mut self, util: u64, is_boost: bool) -> FrameSchedResult<()> {
        if util > CAPACITY_SCALE {
            return Err(FrameSchedError::invalid_argument(format!(
                "min util {util} above {CAPACITY_SCALE}"
            )));
        }
        if is_boost {
            self.boost_min_util = util;
        } else {
            if util > self.frame_max_util {
                return Err(FrameSchedError::invalid_argument(format!(
                    "min util {util} above max util {}",
                    self.frame_max_util
                )));
            }
            self.frame_min_util = util;
        }
        self.refresh_util();
        Ok(())
    }

    /// Set the upper utilization bound.
    ///
    /// # Errors
    ///
    /// Rejects values above `CAPACITY_SCALE` or below the current minimum.
    pub fn set_max_util(&mut self, util: u64) -> FrameSchedResult<()> {
        if util > CAPACITY_SCALE {
            return Err(FrameSchedError::invalid_argument(format!(
                "max util {util} above {CAPACITY_SCALE}"
            )));
        }
        if util < self.frame_min_util {
            return Err(FrameSchedError::invalid_argument(format!(
                "max util {util} below min util {}",
                self.frame_min_util
            )));
        }
        self.frame_max_util = util;
        self.refresh_util();
        Ok(())
    }

    /// Set the lower bound applied to previous-load snapshots.
    ///
    /// # Errors
    ///
    /// Rejects values above `CAPACITY_SCALE` or above the previous maximum.
    pub fn set_prev_min_util(&mut self, util: u64) -> FrameSchedResult<()> {
        if util > CAPACITY_SCALE || util > self.prev_max_util {
            return Err(FrameSchedError::invalid_argument(format!(
                "prev min util {util} above prev max util {}",
                self.prev_max_util.min(CAPACITY_SCALE)
            )));
        }
        self.prev_min_util = util;
        Ok(())
    }

    /// Set the upper bound applied to previous-load snapshots.
    ///
    /// # Errors
    ///
    /// Rejects values above `CAPACITY_SCALE` or below the previous minimum.
    pub fn set_prev_max_util(&mut self, util: u64) -> FrameSchedResult<()> {
        if util > CAPACITY_SCALE || util < self.prev_min_util {
            return Err(FrameSchedError::invalid_argument(format!(
                "prev max util {util} below prev min util {}",
                self.prev_min_util
            )));
        }
        self.prev_max_util = util;
        Ok(())
    }

    /// Apply a boost floor (0 clears it) and refresh the utilization.
    pub fn set_boost_floor(&mut self, util: u64) {
        self.boost_min_util = util.min(CAPACITY_SCALE);
        self.refresh_util();
    }

    /// Record the window that just rolled, so boundary snapshots can price
    /// the previous frame.
    pub fn note_window(&mut self, prev_load: u64, prev_exec_ns: u64, prev_time_ns: u64) {
        self.prev_frame_load = prev_load;
        self.prev_frame_exec_ns = prev_exec_ns;
        self.prev_frame_time_ns = prev_time_ns;
    }

    /// Open a frame.
    ///
    /// Coming from `End`/`Invalid` the previous-load snapshot uses the fake
    /// denominator `max(prev_frame_time, frame_time)` so a short real gap
    /// does not inflate the ratio; a repeated `Start` uses the configured
    /// frame time directly.
    pub fn begin_frame(&mut self, margin_immediate: bool) {
        let fake = self.status != FrameStatus::Start;
        self.snapshot_prev(fake);
        self.status = FrameStatus::Start;
        self.margin_imme = margin_immediate;
        self.frame_vload = if margin_immediate {
            self.calc_frame_vload(0)
        } else {
            0
        };
        self.refresh_util();
    }

    /// Close the open frame. Callers only invoke this from `Start`.
    pub fn end_frame(&mut self) {
        self.snapshot_prev(false);
        self.status = FrameStatus::End;
        self.frame_vload = 0;
        self.frame_min_util = 0;
        self.refresh_util();
    }

    /// Force the stale-window transition; an End-style snapshot with the
    /// status left at `Invalid`.
    pub fn mark_invalid(&mut self) {
        self.snapshot_prev(false);
        self.status = FrameStatus::Invalid;
        self.frame_vload = 0;
        self.refresh_util();
    }

    /// Recompute the virtual load for `vtime_ms` milliseconds into the frame.
    pub fn update_vload(&mut self, vtime_ms: i64) {
        self.frame_vload = self.calc_frame_vload(vtime_ms);
        self.refresh_util();
    }

    /// Deadline-proximity ramp.
    ///
    /// Near zero early in the window, rising steeply as the deadline
    /// approaches; saturates at [`FRAME_MAX_VLOAD`] once `vtime` reaches
    /// `max_vload_time` (or whenever the margin drives `max_vload_time`
    /// non-positive).
    #[must_use]
    pub fn calc_frame_vload(&self, vtime_ms: i64) -> u64 {
        let max_time = self.max_vload_time_ms;
        if max_time <= 0 || vtime_ms >= max_time {
            return FRAME_MAX_VLOAD;
        }
        if vtime_ms <= 0 {
            return 0;
        }
        let factor = vtime_ms + (FRAME_MAX_VLOAD as i64) / max_time;
        if factor <= max_time {
            0
        } else {
            (vtime_ms.saturating_mul(factor - max_time)).min(FRAME_MAX_VLOAD as i64) as u64
        }
    }

    /// `clamp(max(prior_snapshot, frame_vload, boost_floor), min, max)`.
    fn refresh_util(&mut self) {
        let prior = if self.snapshot_is_fake {
            self.prev_fake_load_util
        } else {
            self.prev_frame_load_util
        };
        let util = prior.max(self.frame_vload).max(self.boost_min_util);
        self.frame_util = util.clamp(self.frame_min_util, self.frame_max_util);
    }

    fn snapshot_prev(&mut self, fake: bool) {
        if fake {
            let denom = self.prev_frame_time_ns.max(self.frame_time_ns);
            self.prev_fake_load_util = self.load_to_util(self.prev_frame_load, denom);
        } else {
            self.prev_frame_load_util = self.load_to_util(self.prev_frame_load, self.frame_time_ns);
        }
        self.snapshot_is_fake = fake;
    }

    fn load_to_util(&self, load: u64, denom_ns: u64) -> u64 {
        if denom_ns == 0 {
            return self.prev_max_util;
        }
        let util = load.saturating_mul(CAPACITY_SCALE) / denom_ns;
        util.min(CAPACITY_SCALE)
            .clamp(self.prev_min_util, self.prev_max_util)
    }

    /// Reset everything to construction defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Current machine state.
    #[must_use]
    pub fn status(&self) -> FrameStatus {
        self.status
    }

    /// Current utilization hint, always within the configured bounds.
    #[must_use]
    pub fn frame_util(&self) -> u64 {
        self.frame_util
    }

    /// Current virtual load.
    #[must_use]
    pub fn frame_vload(&self) -> u64 {
        self.frame_vload
    }

    /// Configured frame period in nanoseconds.
    #[must_use]
    pub fn frame_time_ns(&self) -> u64 {
        self.frame_time_ns
    }

    /// Configured frame rate in frames per second.
    #[must_use]
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Milliseconds after which the virtual load saturates.
    #[must_use]
    pub fn max_vload_time_ms(&self) -> i64 {
        self.max_vload_time_ms
    }

    /// Staleness bound for the open window.
    #[must_use]
    pub fn util_invalid_interval_ns(&self) -> u64 {
        self.util_invalid_interval_ns
    }

    /// Minimum spacing of rate-limited governor notifications.
    #[must_use]
    pub fn freq_update_interval_ns(&self) -> u64 {
        self.freq_update_interval_ns
    }

    /// Currently applied boost floor.
    #[must_use]
    pub fn boost_min_util(&self) -> u64 {
        self.boost_min_util
    }

    /// Lower utilization bound.
    #[must_use]
    pub fn frame_min_util(&self) -> u64 {
        self.frame_min_util
    }

    /// Upper utilization bound.
    #[must_use]
    pub fn frame_max_util(&self) -> u64 {
        self.frame_max_util
    }

    /// Whether the last boundary skipped its timestamp update.
    #[must_use]
    pub fn timestamp_skipped(&self) -> bool {
        self.timestamp_skipped
    }

    /// Mark or clear the skipped-timestamp flag.
    pub fn set_timestamp_skipped(&mut self, skipped: bool) {
        self.timestamp_skipped = skipped;
    }
}
