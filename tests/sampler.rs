//! Window rotation behavior of the sampler, driven by explicit
//! timestamps for determinism.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use windowed_quantiles::{Sampler, WindowedSampler, DEFAULT_WINDOW};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn sampler() -> WindowedSampler {
    WindowedSampler::new(DEFAULT_WINDOW).unwrap()
}

#[test]
fn steady_traffic_keeps_one_window_of_data() {
    let sampler = sampler();

    let mut t = 0;
    for _ in 0..300 {
        t += 1;
        sampler.update_at(100, at(t));
    }

    // Only the completed 30-second window is readable.
    assert_eq!(sampler.size_at(at(t)), 30);

    let snapshot = sampler.snapshot_at(at(t));
    assert_eq!(snapshot.value_at(0.5), 100.0);
    assert_eq!(snapshot.value_at(0.99), 100.0);
}

#[test]
fn rotating_values_stay_within_the_window() {
    let sampler = sampler();

    let mut t = 0;
    for i in 0..300u64 {
        t += 1;
        sampler.update_at((i % 3) as i64, at(t));
    }

    assert_eq!(sampler.size_at(at(t)), 30);

    let snapshot = sampler.snapshot_at(at(t));
    assert_eq!(snapshot.value_at(0.5), 1.0);
    assert_eq!(snapshot.value_at(0.99), 2.0);
}

#[test]
fn snapshot_in_current_window_reads_the_previous_one() {
    let sampler = sampler();

    // [0 s, 30 s) holds thirty 1s, [30 s, 60 s) fifteen 2s.
    for i in 0..45u64 {
        let value = if i < 30 { 1 } else { 2 };
        sampler.update_at(value, at(i));
    }

    // 45 s is inside the current window, so the snapshot covers the
    // completed window of 1s.
    let snapshot = sampler.snapshot_at(at(45));
    assert_eq!(snapshot.value_at(0.5), 1.0);
    assert_eq!(snapshot.size(), 30);
}

#[test]
fn snapshot_at_the_boundary_rotates_the_filling_window() {
    let sampler = sampler();

    for i in 0..30u64 {
        sampler.update_at(1, at(i));
    }

    // 30 s is one past the current window, so the bucket that was
    // filling becomes the readable one.
    let snapshot = sampler.snapshot_at(at(30));
    assert_eq!(snapshot.value_at(0.5), 1.0);
    assert_eq!(snapshot.size(), 30);
}

#[test]
fn snapshot_far_in_the_future_is_empty() {
    let sampler = sampler();

    for i in 0..30u64 {
        sampler.update_at(1, at(i));
    }

    // Two full windows with no traffic leave nothing representative.
    let snapshot = sampler.snapshot_at(at(130));
    assert_eq!(snapshot.size(), 0);
    assert!(snapshot.is_empty());
}

#[test]
fn long_gap_between_updates_drops_old_data() {
    let sampler = sampler();

    for _ in 0..10 {
        sampler.update_at(1, at(0));
    }

    // More than two windows later the 1s are no longer representative
    // and must be discarded when the 10s arrive.
    sampler.update_at(10, at(100));
    sampler.update_at(10, at(100));

    let snapshot = sampler.snapshot_at(at(130));
    assert_eq!(snapshot.size(), 2);
    assert_eq!(snapshot.value_at(0.5), 10.0);
}

#[test]
fn snapshots_are_frozen_at_creation() {
    let sampler = sampler();

    for i in 0..30u64 {
        sampler.update_at(1, at(i));
    }
    let snapshot = sampler.snapshot_at(at(35));
    assert_eq!(snapshot.size(), 30);

    // Keep writing and rotating; the captured view must not move.
    for i in 35..95u64 {
        sampler.update_at(50, at(i));
    }
    assert_eq!(snapshot.size(), 30);
    assert_eq!(snapshot.value_at(0.5), 1.0);
}

#[test]
fn clear_empties_both_windows() {
    let sampler = sampler();

    for i in 0..60u64 {
        sampler.update_at(2, at(i));
    }
    sampler.clear();

    let snapshot = sampler.snapshot_at(at(60));
    assert_eq!(snapshot.size(), 0);
}

#[test]
fn custom_quantile_targets_flow_through() {
    let sampler =
        WindowedSampler::with_quantiles(DEFAULT_WINDOW, &[(0.9, 0.001), (0.5, 0.001)]).unwrap();

    for i in 0..30u64 {
        sampler.update_at(6, at(i));
    }
    let snapshot = sampler.snapshot_at(at(30));
    assert_eq!(snapshot.value_at(0.9), 6.0);

    assert!(WindowedSampler::with_quantiles(DEFAULT_WINDOW, &[]).is_err());
}
