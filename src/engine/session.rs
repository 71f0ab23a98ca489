//! Session scheduling: the two periodic cycles and sensor ingestion.
//!
//! A session owns all ephemeral sensing state (window, device set,
//! baselines). It is created when the engine starts and dropped when it
//! stops, so nothing survives a stop/start cycle. The scheduler runs on
//! a dedicated thread with its own current-thread tokio runtime; shutdown
//! signals a watch channel and joins the thread, which guarantees no tick
//! runs after stop returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, interval_at, sleep_until, timeout_at, Instant, MissedTickBehavior};

use crate::api::types::{ScanSummary, SensingSnapshot, TickUpdate};
use crate::config::{AppConfig, TimingConfig};
use crate::control::VolumeController;
use crate::engine::backend::{MotionSource, ProximityScanner};
use crate::engine::core::TelemetryCtx;
use crate::error::{log_sensing_error, ErrorCode, SessionError};
use crate::sensing::baseline::Baseline;
use crate::sensing::curve::shape;
use crate::sensing::density::CrowdDensityEstimator;
use crate::sensing::fusion::{bluetooth_score, raw_crowd_score, vibration_score};
use crate::sensing::vibration::VibrationEstimator;

/// Estimator state mutated by all three temporal sources.
///
/// Guarded by one mutex so a window insertion, a scan transition, and an
/// output-tick read each observe the state whole, never mid-update.
pub(crate) struct SensingState {
    pub vibration: VibrationEstimator,
    pub density: CrowdDensityEstimator,
    pub baseline: Baseline,
}

impl SensingState {
    fn new() -> Self {
        Self {
            vibration: VibrationEstimator::new(),
            density: CrowdDensityEstimator::new(),
            baseline: Baseline::new(),
        }
    }
}

/// State shared between the scheduler tasks and the engine handle.
pub(crate) struct SessionShared {
    pub sensing: Mutex<SensingState>,
    /// Latched when the scanner reports it cannot scan this session
    pub scanner_degraded: AtomicBool,
    /// Latched when the motion source reports it cannot deliver
    pub motion_degraded: AtomicBool,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            sensing: Mutex::new(SensingState::new()),
            scanner_degraded: AtomicBool::new(false),
            motion_degraded: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock_sensing(&self) -> std::sync::MutexGuard<'_, SensingState> {
        self.sensing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything a session needs at spawn time.
pub(crate) struct SessionStartContext {
    pub config: Arc<RwLock<AppConfig>>,
    pub timing: TimingConfig,
    pub motion: Arc<dyn MotionSource>,
    pub scanner: Arc<dyn ProximityScanner>,
    pub controller: VolumeController,
    pub tick_tx: broadcast::Sender<TickUpdate>,
    pub scan_tx: broadcast::Sender<ScanSummary>,
    pub telemetry: TelemetryCtx,
}

/// One active sensing session: shared estimator state plus the scheduler
/// thread driving it.
pub(crate) struct SessionState {
    shared: Arc<SessionShared>,
    shutdown_tx: watch::Sender<bool>,
    scheduler: Option<thread::JoinHandle<()>>,
}

impl SessionState {
    /// Spawn the scheduler thread and start all three cycles.
    pub(crate) fn spawn(ctx: SessionStartContext) -> Result<Self, SessionError> {
        let shared = Arc::new(SessionShared::new());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task_shared = Arc::clone(&shared);
        let scheduler = thread::Builder::new()
            .name("vibe-session".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        log::error!("[Session] Failed to build scheduler runtime: {}", err);
                        return;
                    }
                };

                rt.block_on(async move {
                    let motion_task = tokio::spawn(drive_motion(
                        Arc::clone(&task_shared),
                        Arc::clone(&ctx.motion),
                        ctx.telemetry.clone(),
                    ));
                    let scan_task = tokio::spawn(drive_scans(
                        Arc::clone(&task_shared),
                        Arc::clone(&ctx.scanner),
                        ctx.timing.clone(),
                        ctx.scan_tx,
                        ctx.telemetry.clone(),
                    ));
                    let output_task = tokio::spawn(drive_output(
                        Arc::clone(&task_shared),
                        ctx.config,
                        ctx.timing,
                        ctx.controller,
                        ctx.tick_tx,
                        ctx.telemetry,
                    ));

                    let _ = shutdown_rx.changed().await;

                    motion_task.abort();
                    scan_task.abort();
                    output_task.abort();
                });
            })
            .map_err(|err| SessionError::SchedulerUnavailable {
                details: err.to_string(),
            })?;

        Ok(Self {
            shared,
            shutdown_tx,
            scheduler: Some(scheduler),
        })
    }

    /// Signal the scheduler and wait for it to exit.
    ///
    /// After this returns no further scan or output tick can execute; an
    /// in-flight scan window is abandoned without latching a count.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.scheduler.take() {
            let _ = handle.join();
        }
        let mut sensing = self.shared.lock_sensing();
        if sensing.density.is_scanning() {
            sensing.density.abort_scan();
        }
    }

    pub(crate) fn snapshot(&self, running: bool) -> SensingSnapshot {
        let sensing = self.shared.lock_sensing();
        SensingSnapshot {
            running,
            scanning: sensing.density.is_scanning(),
            device_count: sensing.density.current_count() as u32,
            vibration_energy: sensing.vibration.current_energy(),
            device_baseline: sensing.baseline.device_count().map(|count| count as u32),
            vibration_baseline: sensing.baseline.vibration(),
        }
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        if self.scheduler.is_some() {
            self.shutdown();
        }
    }
}

/// Start the motion source and fold its samples into the vibration window.
async fn drive_motion(
    shared: Arc<SessionShared>,
    motion: Arc<dyn MotionSource>,
    telemetry: TelemetryCtx,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Err(err) = motion.start(tx) {
        shared.motion_degraded.store(true, Ordering::SeqCst);
        log_sensing_error(&err, "motion_source_start");
        telemetry.warn(format!("motion source unavailable: {}", err.message()));
        return;
    }

    while let Some(sample) = rx.recv().await {
        let magnitude = sample.magnitude();
        shared.lock_sensing().vibration.ingest(magnitude);
    }
}

/// Run the repeating scan cycle: open a window, collect announcements
/// until the window closes, latch the count, and calibrate unset
/// baselines at the window boundary.
async fn drive_scans(
    shared: Arc<SessionShared>,
    scanner: Arc<dyn ProximityScanner>,
    timing: TimingConfig,
    scan_tx: broadcast::Sender<ScanSummary>,
    telemetry: TelemetryCtx,
) {
    let mut timer = interval(timing.scan_interval());
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        let began = shared.lock_sensing().density.begin_scan();
        if !began {
            continue;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let scan_ok = match scanner.start(tx) {
            Ok(()) => true,
            Err(err) => {
                // Log the degradation once; later windows stay quiet.
                if !shared.scanner_degraded.swap(true, Ordering::SeqCst) {
                    log_sensing_error(&err, "proximity_scan_start");
                    telemetry.warn(format!(
                        "proximity scanner unavailable: {}",
                        err.message()
                    ));
                }
                false
            }
        };

        let deadline = Instant::now() + timing.scan_window();
        if scan_ok {
            loop {
                match timeout_at(deadline, rx.recv()).await {
                    Ok(Some(id)) => {
                        shared.lock_sensing().density.record_device(&id);
                    }
                    Ok(None) => {
                        // Scanner went quiet early; hold the window open
                        // so baseline timing stays on cadence.
                        sleep_until(deadline).await;
                        break;
                    }
                    Err(_elapsed) => break,
                }
            }
            scanner.stop();
        } else {
            sleep_until(deadline).await;
        }

        let summary = {
            let mut sensing = shared.lock_sensing();
            let device_count = if scan_ok {
                sensing.density.end_scan()
            } else {
                sensing.density.abort_scan();
                sensing.density.current_count()
            };

            let mut latched = false;
            if scan_ok {
                latched |= sensing.baseline.record_device_baseline_if_unset(device_count);
            }
            if !shared.motion_degraded.load(Ordering::SeqCst) {
                let energy = sensing.vibration.current_energy();
                latched |= sensing.baseline.record_vibration_baseline_if_unset(energy);
            }

            ScanSummary {
                device_count: device_count as u32,
                scan_completed: scan_ok,
                baseline_latched: latched,
                timestamp_ms: telemetry.timestamp_ms(),
            }
        };

        log::debug!(
            "[Session] Scan window closed: devices={} completed={} latched={}",
            summary.device_count,
            summary.scan_completed,
            summary.baseline_latched
        );
        let _ = scan_tx.send(summary);
    }
}

/// Run the repeating output cycle: fuse, shape, steer, notify.
async fn drive_output(
    shared: Arc<SessionShared>,
    config: Arc<RwLock<AppConfig>>,
    timing: TimingConfig,
    controller: VolumeController,
    tick_tx: broadcast::Sender<TickUpdate>,
    telemetry: TelemetryCtx,
) {
    let start = Instant::now() + timing.output_initial_delay();
    let mut timer = interval_at(start, timing.output_interval());
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        // One config read per tick: bounds and curve always agree.
        let control = config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .control
            .clone();

        let (device_count, vibration_energy, bt_score, vib_score) = {
            let sensing = shared.lock_sensing();
            let count = sensing.density.current_count();
            let energy = sensing.vibration.current_energy();
            (
                count,
                energy,
                bluetooth_score(count, sensing.baseline.device_count()),
                vibration_score(energy, sensing.baseline.vibration()),
            )
        };

        let raw = raw_crowd_score(bt_score, vib_score);
        let shaped = shape(raw, control.curve_mode);
        let outcome = controller.apply(shaped, control.min_volume, control.max_volume);

        let update = TickUpdate {
            device_count: device_count as u32,
            vibration_energy,
            shaped_score: shaped,
            target_volume: outcome.requested,
            applied_volume: outcome.applied,
            timestamp_ms: telemetry.timestamp_ms(),
        };

        log::debug!(
            "[Session] Output tick: devices={} energy={:.4} shaped={:.3} volume={}/{}",
            update.device_count,
            update.vibration_energy,
            update.shaped_score,
            update.applied_volume,
            update.target_volume
        );
        let _ = tick_tx.send(update);
    }
}
