//! End-to-end lifecycle tests for the scheduling assistant.

#![allow(clippy::unwrap_used, clippy::panic)]

use frameassist_core::prelude::*;
use frameassist_test_helpers::prelude::*;

const GROUP: GroupId = GroupId(1);
const THREAD: ThreadId = ThreadId(100);

fn start(h: &TestHarness) {
    h.assist
        .signal_frame_boundary(GROUP, BoundaryKind::Start, BoundaryFlags::default())
        .unwrap();
}

#[test]
fn test_vload_ramp_toward_deadline() {
    // fps=60, margin=16 => saturation at 16 + 16 = 32ms.
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);

    // Early in the window the ramp is still flat.
    h.clock.advance_ms(10);
    h.assist.account_tick(THREAD, 9 * NSEC_PER_MSEC, 0);
    let early = h.assist.query_group_util(GROUP).unwrap();

    // One millisecond before the deadline margin: 31 * 31 = 961.
    h.clock.advance_ms(21);
    h.assist.account_tick(THREAD, 20 * NSEC_PER_MSEC, 0);
    let late = h.assist.query_group_util(GROUP).unwrap();
    assert_eq!(late, 961);
    assert!(late > early);

    // At the saturation point the full capacity is requested.
    h.clock.advance_ms(1);
    h.assist.account_tick(THREAD, NSEC_PER_MSEC, 0);
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), FRAME_MAX_VLOAD);
}

#[test]
fn test_boost_floor_and_expiry() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);

    h.assist.start_boost(GROUP, 50, 300).unwrap();
    assert!(h.assist.query_group_util(GROUP).unwrap() >= 300);
    assert!(h.assist.boost_pending(GROUP));

    // Past the deadline, the next tick expires the boost and utilization
    // reverts to the pre-boost baseline.
    h.clock.advance_ms(51);
    h.assist.account_tick(THREAD, NSEC_PER_MSEC, NSEC_PER_MSEC);
    assert!(!h.assist.boost_pending(GROUP));
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);
}

#[test]
fn test_boost_never_shortens_deadline() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    h.assist.start_boost(GROUP, 100, 300).unwrap();
    // A shorter re-arm is a no-op, floor included.
    h.assist.start_boost(GROUP, 10, 900).unwrap();
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 300);

    h.clock.advance_ms(50);
    h.assist.account_tick(THREAD, NSEC_PER_MSEC, 0);
    // 50ms in: the original 100ms deadline must still be pending.
    assert!(h.assist.boost_pending(GROUP));
}

#[test]
fn test_start_start_keeps_nonfake_snapshot() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);

    // 8ms of load in the first 10ms of the frame.
    h.clock.advance_ms(10);
    h.assist
        .account_tick(THREAD, 8 * NSEC_PER_MSEC, 8 * NSEC_PER_MSEC);

    // Second Start without an intervening End, 30ms into the window. The
    // snapshot must divide by the configured frame time (16.67ms => ~491),
    // not by the longer real window (30ms => ~273).
    h.clock.advance_ms(20);
    start(&h);
    let util = h.assist.query_group_util(GROUP).unwrap();
    assert!((485..=495).contains(&util), "expected non-fake snapshot, got {util}");
}

#[test]
fn test_idle_start_uses_fake_snapshot() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);
    h.clock.advance_ms(1);
    h.assist
        .signal_frame_boundary(GROUP, BoundaryKind::End, BoundaryFlags::default())
        .unwrap();

    // 8ms of load spread over a 30ms idle gap.
    h.clock.advance_ms(30);
    h.assist
        .account_tick(THREAD, 8 * NSEC_PER_MSEC, 8 * NSEC_PER_MSEC);

    // Start from idle: the fake denominator max(30ms, 16.67ms) deflates the
    // snapshot to ~273 where a plain frame-time snapshot would read ~491.
    start(&h);
    let util = h.assist.query_group_util(GROUP).unwrap();
    assert!((265..=280).contains(&util), "expected fake snapshot, got {util}");
}

#[test]
fn test_stale_window_forces_invalid_and_fresh_vload() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);

    // 40ms without meaningful progress: past util_invalid_interval (33ms)
    // with exec * 4 well under the elapsed time.
    h.clock.advance_ms(40);
    h.assist.account_tick(THREAD, NSEC_PER_MSEC, NSEC_PER_MSEC);

    // The next frame computes its vload from the post-rollover window start.
    h.clock.advance_ms(2);
    start(&h);
    h.clock.advance_ms(5);
    h.assist
        .account_tick(THREAD, 5 * NSEC_PER_MSEC, 5 * NSEC_PER_MSEC);
    // 5ms into a 32ms ramp: 5 * (5 + 32 - 32) = 25. A stale window start
    // would have saturated to 1024 instead.
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 25);
}

#[test]
fn test_attach_is_idempotent_and_detach_validates() {
    let h = harness();
    h.assist.attach_thread(THREAD, GROUP).unwrap();
    h.assist.attach_thread(THREAD, GROUP).unwrap();
    let group = h.assist.registry().group(GROUP).unwrap();
    assert_eq!(group.member_count(), 1);

    let err = h.assist.detach_thread(ThreadId(999)).unwrap_err();
    assert!(matches!(err, FrameSchedError::ThreadNotFound(_)));
    assert_eq!(group.member_count(), 1);

    h.assist.detach_thread(THREAD).unwrap();
    assert_eq!(group.member_count(), 0);
}

#[test]
fn test_group_id_range_is_enforced() {
    let h = harness();
    assert!(matches!(
        h.assist.attach_thread(THREAD, GroupId(0)),
        Err(FrameSchedError::GroupNotFound(_))
    ));
    assert!(matches!(
        h.assist.attach_thread(THREAD, GroupId(1_000)),
        Err(FrameSchedError::GroupNotFound(_))
    ));
}

#[test]
fn test_rejected_setter_keeps_previous_config() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);
    h.clock.advance_ms(32);
    h.assist.account_tick(THREAD, 30 * NSEC_PER_MSEC, 0);
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), FRAME_MAX_VLOAD);

    // A rejected rate leaves the 60fps ramp in place.
    assert!(h.assist.set_frame_rate(GROUP, 500).is_err());
    assert!(h.assist.set_frame_margin(GROUP, 5_000).is_err());
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), FRAME_MAX_VLOAD);
}

#[test]
fn test_util_bound_setters_validate_pairs() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    h.assist.set_frame_max_util(GROUP, 600).unwrap();
    assert!(h.assist.set_frame_min_util(GROUP, 700, false).is_err());
    h.assist.set_frame_min_util(GROUP, 200, false).unwrap();
    assert!(h.assist.set_frame_max_util(GROUP, 100).is_err());

    h.assist.set_frame_max_prev_util(GROUP, 800).unwrap();
    assert!(h.assist.set_frame_min_prev_util(GROUP, 900).is_err());

    // The floor shows up immediately through the clamp.
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 200);
}

#[test]
fn test_disable_resets_state() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);
    h.clock.advance_ms(32);
    h.assist.account_tick(THREAD, 30 * NSEC_PER_MSEC, 0);
    assert!(h.assist.query_group_util(GROUP).unwrap() > 0);

    h.assist.disable_frame_scheduling(GROUP).unwrap();
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);

    // Redundant transitions succeed.
    h.assist.disable_frame_scheduling(GROUP).unwrap();
    h.assist.enable_frame_scheduling(GROUP).unwrap();
    h.assist.enable_frame_scheduling(GROUP).unwrap();

    // Boundaries are ignored while disabled.
    h.assist.disable_frame_scheduling(GROUP).unwrap();
    start(&h);
    h.clock.advance_ms(32);
    h.assist.account_tick(THREAD, NSEC_PER_MSEC, 0);
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);
}

#[test]
fn test_boost_only_group_stops_tracking_on_expiry() {
    let h = harness();
    // No enable, no members: the boost alone switches tracking on.
    h.assist.start_boost(GROUP, 20, 400).unwrap();
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 400);

    h.clock.advance_ms(21);
    // Any tick drives the wheel, even one for an unrelated thread.
    h.assist.account_tick(ThreadId(555), NSEC_PER_MSEC, 0);
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);

    // Boundaries stay ignored because tracking stopped with the boost.
    start(&h);
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);
}

#[test]
fn test_skip_start_preserves_window() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);
    h.clock.advance_ms(10);
    h.assist
        .account_tick(THREAD, 8 * NSEC_PER_MSEC, 8 * NSEC_PER_MSEC);

    // A skipped start must not roll the window: the vload keeps ramping
    // from the original window start.
    h.clock.advance_ms(10);
    let flags = BoundaryFlags {
        skip_start: true,
        ..BoundaryFlags::default()
    };
    h.assist
        .signal_frame_boundary(GROUP, BoundaryKind::Start, flags)
        .unwrap();
    h.clock.advance_ms(11);
    h.assist
        .account_tick(THREAD, 10 * NSEC_PER_MSEC, 10 * NSEC_PER_MSEC);
    // 31ms from the original start: 31 * 31 = 961.
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 961);
}

#[test]
fn test_skip_end_defers_rollover() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);
    h.clock.advance_ms(10);
    h.assist
        .account_tick(THREAD, 8 * NSEC_PER_MSEC, 8 * NSEC_PER_MSEC);

    // A skipped end closes the frame but keeps the window open: its snapshot
    // prices the window closed at the last unskipped boundary (empty), not
    // the 8ms accumulated since.
    h.clock.advance_ms(10);
    let flags = BoundaryFlags {
        skip_end: true,
        ..BoundaryFlags::default()
    };
    h.assist
        .signal_frame_boundary(GROUP, BoundaryKind::End, flags)
        .unwrap();
    assert_eq!(h.assist.query_group_util(GROUP).unwrap(), 0);

    // The next unskipped start rolls the whole 30ms span at once; the fake
    // denominator max(30ms, 16.67ms) prices the 8ms of load at ~273.
    h.clock.advance_ms(10);
    start(&h);
    let util = h.assist.query_group_util(GROUP).unwrap();
    assert!((265..=280).contains(&util), "expected deferred rollover, got {util}");
}

#[test]
fn test_cluster_selection_tracks_demand() {
    let h = harness_with_group(GROUP, THREAD, 60, 16);
    start(&h);
    h.governor.clear();

    // Saturated demand needs the big cluster; the change refreshes the new
    // cluster's representative CPU immediately.
    h.clock.advance_ms(32);
    h.assist
        .account_tick(THREAD, 30 * NSEC_PER_MSEC, 30 * NSEC_PER_MSEC);
    let requests = h.governor.requests();
    assert!(
        requests.iter().any(|(cpu, immediate)| *cpu == CpuId(4) && *immediate),
        "big cluster not refreshed: {requests:?}"
    );
}
