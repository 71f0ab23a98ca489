//! Integration tests for the full sensing session
//!
//! These drive a complete simulated session across the crate: scheduler
//! cycles, scan windows, baseline latching, volume steering, and the
//! stop/start reset. Timings are compressed so each test finishes in a
//! few hundred milliseconds; assertions use generous deadlines rather
//! than exact tick counts to stay robust on loaded machines.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;
use vibe_volume::api::types::{SensingSnapshot, TickUpdate};
use vibe_volume::config::{AppConfig, ControlConfig, TimingConfig};
use vibe_volume::engine::backend::{
    DeniedProximityScanner, SimMotionSource, SimProximityScanner, SimVolumeSink,
    UnavailableMotionSource,
};
use vibe_volume::engine::EngineHandle;
use vibe_volume::sensing::CurveMode;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn fast_config() -> AppConfig {
    AppConfig {
        control: ControlConfig::default(),
        timing: TimingConfig {
            scan_interval_ms: 80,
            scan_window_ms: 30,
            output_interval_ms: 40,
            output_initial_delay_ms: 40,
        },
    }
}

fn advertisers(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("de:vi:ce:00:00:{:02x}", i)).collect()
}

fn collect_ticks(rx: &mut UnboundedReceiver<TickUpdate>, want: usize) -> Vec<TickUpdate> {
    let deadline = Instant::now() + TEST_TIMEOUT;
    let mut ticks = Vec::new();
    while Instant::now() < deadline && ticks.len() < want {
        match rx.try_recv() {
            Ok(update) => ticks.push(update),
            Err(_) => thread::sleep(Duration::from_millis(5)),
        }
    }
    ticks
}

fn wait_for_snapshot(
    engine: &EngineHandle,
    predicate: impl Fn(&SensingSnapshot) -> bool,
) -> Option<SensingSnapshot> {
    let deadline = Instant::now() + TEST_TIMEOUT;
    while Instant::now() < deadline {
        let snapshot = engine.sensing_snapshot();
        if predicate(&snapshot) {
            return Some(snapshot);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

#[test]
fn full_session_emits_bounded_ticks() {
    let engine = EngineHandle::with_backends(
        fast_config(),
        Arc::new(SimMotionSource::new(Duration::from_millis(3), 0.3)),
        Arc::new(SimProximityScanner::new(advertisers(6))),
        Arc::new(SimVolumeSink::new(15)),
    );

    let mut ticks = engine.subscribe_tick_updates();
    engine.start_session().unwrap();

    let updates = collect_ticks(&mut ticks, 5);
    assert!(updates.len() >= 5, "expected at least 5 output ticks");
    for update in &updates {
        assert!(
            (3..=12).contains(&update.applied_volume),
            "applied volume {} outside configured bounds",
            update.applied_volume
        );
        assert!((0.0..=1.0).contains(&update.shaped_score));
        assert!(update.vibration_energy >= 0.0);
    }

    // The first completed scan counts every unique advertiser exactly once
    // despite repeated announcements.
    let snapshot = wait_for_snapshot(&engine, |s| s.device_count == 6)
        .expect("scan never latched the advertiser count");
    assert_eq!(snapshot.device_count, 6);

    engine.stop_session().unwrap();
}

#[test]
fn first_scan_latches_both_baselines() {
    let engine = EngineHandle::with_backends(
        fast_config(),
        Arc::new(SimMotionSource::new(Duration::from_millis(3), 0.3)),
        Arc::new(SimProximityScanner::new(advertisers(4))),
        Arc::new(SimVolumeSink::new(15)),
    );

    let mut summaries = engine.subscribe_scan_summaries();
    engine.start_session().unwrap();

    let deadline = Instant::now() + TEST_TIMEOUT;
    let mut first_summary = None;
    while Instant::now() < deadline && first_summary.is_none() {
        match summaries.try_recv() {
            Ok(summary) => first_summary = Some(summary),
            Err(_) => thread::sleep(Duration::from_millis(5)),
        }
    }
    let summary = first_summary.expect("no scan summary arrived");
    assert!(summary.scan_completed);
    assert_eq!(summary.device_count, 4);
    assert!(summary.baseline_latched);

    let snapshot = engine.sensing_snapshot();
    assert_eq!(snapshot.device_baseline, Some(4));
    assert!(snapshot.vibration_baseline.is_some());

    engine.stop_session().unwrap();
}

#[test]
fn stop_then_start_resets_estimators() {
    // Wide scan window so the restarted session is observably uncalibrated.
    let config = AppConfig {
        control: ControlConfig::default(),
        timing: TimingConfig {
            scan_interval_ms: 400,
            scan_window_ms: 120,
            output_interval_ms: 40,
            output_initial_delay_ms: 40,
        },
    };
    let engine = EngineHandle::with_backends(
        config,
        Arc::new(SimMotionSource::new(Duration::from_millis(3), 0.3)),
        Arc::new(SimProximityScanner::new(advertisers(5))),
        Arc::new(SimVolumeSink::new(15)),
    );

    engine.start_session().unwrap();
    wait_for_snapshot(&engine, |s| {
        s.device_baseline.is_some() && s.vibration_baseline.is_some()
    })
    .expect("first session never calibrated");

    engine.stop_session().unwrap();
    let stopped = engine.sensing_snapshot();
    assert!(!stopped.running);
    assert_eq!(stopped.device_count, 0);
    assert_eq!(stopped.vibration_energy, 0.0);
    assert_eq!(stopped.device_baseline, None);
    assert_eq!(stopped.vibration_baseline, None);

    engine.start_session().unwrap();
    let restarted = engine.sensing_snapshot();
    assert!(restarted.running);
    assert_eq!(restarted.device_count, 0);
    assert_eq!(restarted.device_baseline, None);
    assert_eq!(restarted.vibration_baseline, None);

    engine.stop_session().unwrap();
}

#[test]
fn denied_scanner_keeps_density_neutral_but_calibrates_motion() {
    let engine = EngineHandle::with_backends(
        fast_config(),
        Arc::new(SimMotionSource::new(Duration::from_millis(3), 0.3)),
        Arc::new(DeniedProximityScanner::default()),
        Arc::new(SimVolumeSink::new(15)),
    );

    let mut summaries = engine.subscribe_scan_summaries();
    engine.start_session().unwrap();

    let deadline = Instant::now() + TEST_TIMEOUT;
    let mut first_summary = None;
    while Instant::now() < deadline && first_summary.is_none() {
        match summaries.try_recv() {
            Ok(summary) => first_summary = Some(summary),
            Err(_) => thread::sleep(Duration::from_millis(5)),
        }
    }
    let summary = first_summary.expect("no scan summary arrived");
    assert!(!summary.scan_completed);

    // Vibration still calibrates at the window boundary; density never does.
    let snapshot = wait_for_snapshot(&engine, |s| s.vibration_baseline.is_some())
        .expect("vibration baseline never latched");
    assert_eq!(snapshot.device_baseline, None);
    assert_eq!(snapshot.device_count, 0);

    engine.stop_session().unwrap();
}

#[test]
fn unavailable_motion_keeps_vibration_neutral_but_calibrates_density() {
    let engine = EngineHandle::with_backends(
        fast_config(),
        Arc::new(UnavailableMotionSource::default()),
        Arc::new(SimProximityScanner::new(advertisers(3))),
        Arc::new(SimVolumeSink::new(15)),
    );

    engine.start_session().unwrap();

    let snapshot = wait_for_snapshot(&engine, |s| s.device_baseline.is_some())
        .expect("device baseline never latched");
    assert_eq!(snapshot.device_baseline, Some(3));
    assert_eq!(snapshot.vibration_baseline, None);
    assert_eq!(snapshot.vibration_energy, 0.0);

    engine.stop_session().unwrap();
}

#[test]
fn rejected_sink_writes_surface_through_readback() {
    let sink = Arc::new(SimVolumeSink::new(15));
    sink.set_fail_writes(true);
    let engine = EngineHandle::with_backends(
        fast_config(),
        Arc::new(SimMotionSource::new(Duration::from_millis(3), 0.3)),
        Arc::new(SimProximityScanner::new(advertisers(4))),
        Arc::clone(&sink) as Arc<dyn vibe_volume::engine::backend::VolumeSink>,
    );

    let mut ticks = engine.subscribe_tick_updates();
    engine.start_session().unwrap();

    let updates = collect_ticks(&mut ticks, 2);
    assert!(!updates.is_empty(), "expected output ticks");
    for update in &updates {
        // The controller keeps requesting in-bounds targets; the sink
        // rejects every write, so the read-back stays at the floor.
        assert!(update.target_volume >= 3);
        assert_eq!(update.applied_volume, 0);
        assert_ne!(update.target_volume, update.applied_volume);
    }

    engine.stop_session().unwrap();
}

#[test]
fn curve_change_applies_on_next_tick() {
    // Scans are pushed far beyond the test horizon, so both baselines stay
    // unset and every tick fuses two neutral scores into raw 0.5.
    let config = AppConfig {
        control: ControlConfig::default(),
        timing: TimingConfig {
            scan_interval_ms: 60_000,
            scan_window_ms: 30_000,
            output_interval_ms: 30,
            output_initial_delay_ms: 30,
        },
    };
    let engine = EngineHandle::with_backends(
        config,
        Arc::new(SimMotionSource::new(Duration::from_millis(3), 0.3)),
        Arc::new(SimProximityScanner::new(advertisers(4))),
        Arc::new(SimVolumeSink::new(15)),
    );

    let mut ticks = engine.subscribe_tick_updates();
    engine.start_session().unwrap();

    // Medium curve: raw 0.5 maps to round(3 + 9 * 0.5) = 8.
    let medium = collect_ticks(&mut ticks, 2);
    assert!(!medium.is_empty());
    for update in &medium {
        assert_eq!(update.target_volume, 8);
    }

    engine.set_curve_mode(CurveMode::Aggressive);

    // Aggressive curve: shaped 0.25 maps to round(3 + 9 * 0.25) = 5.
    // Skip ticks that may have been computed before the change landed.
    let deadline = Instant::now() + TEST_TIMEOUT;
    let mut saw_aggressive = false;
    while Instant::now() < deadline && !saw_aggressive {
        match ticks.try_recv() {
            Ok(update) => {
                if update.target_volume == 5 {
                    saw_aggressive = true;
                }
            }
            Err(_) => thread::sleep(Duration::from_millis(5)),
        }
    }
    assert!(saw_aggressive, "curve change never reflected in output");

    engine.stop_session().unwrap();
}

#[test]
fn growing_crowd_raises_volume() {
    let scanner = Arc::new(SimProximityScanner::new(advertisers(4)));
    let engine = EngineHandle::with_backends(
        fast_config(),
        Arc::new(SimMotionSource::new(Duration::from_millis(3), 0.3)),
        Arc::clone(&scanner) as Arc<dyn vibe_volume::engine::backend::ProximityScanner>,
        Arc::new(SimVolumeSink::new(15)),
    );

    let mut ticks = engine.subscribe_tick_updates();
    engine.start_session().unwrap();

    // First scan calibrates against four devices.
    wait_for_snapshot(&engine, |s| s.device_baseline == Some(4))
        .expect("baseline never calibrated");

    // The room fills to twice the baseline.
    scanner.set_advertisers(advertisers(8));
    let snapshot = wait_for_snapshot(&engine, |s| s.device_count == 8)
        .expect("crowded scan never counted");
    assert_eq!(snapshot.device_baseline, Some(4));

    // Density is saturated; the fused score is at least the density weight,
    // so the target clears the midpoint of the [3, 12] range.
    let deadline = Instant::now() + TEST_TIMEOUT;
    let mut saw_loud_tick = false;
    while Instant::now() < deadline && !saw_loud_tick {
        match ticks.try_recv() {
            Ok(update) => {
                if update.device_count == 8 && update.target_volume >= 8 {
                    saw_loud_tick = true;
                }
            }
            Err(_) => thread::sleep(Duration::from_millis(5)),
        }
    }
    assert!(saw_loud_tick, "crowded room never raised the volume");

    engine.stop_session().unwrap();
}
