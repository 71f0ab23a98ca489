//! EngineHandle: reusable session orchestration layer.
//!
//! This struct owns the shared configuration, the trait-based platform
//! backends, the observer broadcast channels, and the lifecycle of the
//! active sensing session. CLI, HTTP, and embedding entry points all
//! drive the core through it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::api::types::SensingSnapshot;
use crate::config::AppConfig;
use crate::control::VolumeController;
use crate::engine::backend::{
    MotionSource, ProximityScanner, SimMotionSource, SimProximityScanner, SimVolumeSink,
    SystemTimeSource, TimeSource, VolumeSink,
};
use crate::engine::session::{SessionStartContext, SessionState};
use crate::error::{log_config_error, log_session_error, ConfigError, SessionError};
use crate::managers::BroadcastChannelManager;
use crate::sensing::curve::CurveMode;

/// Patch describing parameter updates to apply to the running engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamPatch {
    #[serde(default)]
    pub min_volume: Option<u32>,
    #[serde(default)]
    pub max_volume: Option<u32>,
    #[serde(default)]
    pub curve_mode: Option<CurveMode>,
}

/// Telemetry event emitted by the engine core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TelemetryEventKind {
    SessionStarted,
    SessionStopped,
    BoundsChanged { min: u32, max: u32 },
    CurveChanged { mode: CurveMode },
    Warning,
}

/// Shared telemetry publisher handed to session tasks.
#[derive(Clone)]
pub(crate) struct TelemetryCtx {
    tx: broadcast::Sender<TelemetryEvent>,
    time_source: Arc<dyn TimeSource>,
    start_instant: Instant,
}

impl TelemetryCtx {
    pub(crate) fn timestamp_ms(&self) -> u64 {
        self.time_source
            .now()
            .saturating_duration_since(self.start_instant)
            .as_millis() as u64
    }

    pub(crate) fn emit(&self, kind: TelemetryEventKind, detail: Option<String>) {
        let _ = self.tx.send(TelemetryEvent {
            timestamp_ms: self.timestamp_ms(),
            kind,
            detail,
        });
    }

    pub(crate) fn warn(&self, detail: String) {
        self.emit(TelemetryEventKind::Warning, Some(detail));
    }
}

/// EngineHandle orchestrates the sensing session and shared channels.
pub struct EngineHandle {
    config: Arc<RwLock<AppConfig>>,
    motion: Arc<dyn MotionSource>,
    scanner: Arc<dyn ProximityScanner>,
    sink: Arc<dyn VolumeSink>,
    pub(crate) broadcasts: BroadcastChannelManager,
    telemetry_tx: broadcast::Sender<TelemetryEvent>,
    session: Mutex<Option<SessionState>>,
    session_running: AtomicBool,
    time_source: Arc<dyn TimeSource>,
    start_instant: Instant,
}

impl EngineHandle {
    /// Create a new EngineHandle over the simulated backends.
    ///
    /// Platform embeddings construct their own backends and use
    /// [EngineHandle::with_backends] instead.
    pub fn new() -> Self {
        Self::with_backends(
            AppConfig::load(),
            Arc::new(SimMotionSource::default()),
            Arc::new(SimProximityScanner::default()),
            Arc::new(SimVolumeSink::default()),
        )
    }

    /// Create an EngineHandle over explicit platform backends.
    pub fn with_backends(
        config: AppConfig,
        motion: Arc<dyn MotionSource>,
        scanner: Arc<dyn ProximityScanner>,
        sink: Arc<dyn VolumeSink>,
    ) -> Self {
        let (telemetry_tx, _) = broadcast::channel(128);

        // Observer channels live for the handle's lifetime, so subscribers
        // stay attached across stop/start cycles.
        let broadcasts = BroadcastChannelManager::new();
        let _ = broadcasts.init_tick_updates();
        let _ = broadcasts.init_scan_summaries();

        Self {
            config: Arc::new(RwLock::new(config)),
            motion,
            scanner,
            sink,
            broadcasts,
            telemetry_tx,
            session: Mutex::new(None),
            session_running: AtomicBool::new(false),
            time_source: Arc::new(SystemTimeSource::default()),
            start_instant: Instant::now(),
        }
    }

    pub(crate) fn telemetry_ctx(&self) -> TelemetryCtx {
        TelemetryCtx {
            tx: self.telemetry_tx.clone(),
            time_source: Arc::clone(&self.time_source),
            start_instant: self.start_instant,
        }
    }

    fn emit_event(&self, kind: TelemetryEventKind, detail: Option<String>) {
        self.telemetry_ctx().emit(kind, detail);
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Option<SessionState>>, SessionError> {
        self.session.lock().map_err(|_| SessionError::LockPoisoned {
            component: "Session".to_string(),
        })
    }

    // ========================================================================
    // SESSION LIFECYCLE
    // ========================================================================

    /// Start a sensing session.
    ///
    /// Spawns the scheduler with fresh estimator state: nothing from a
    /// previous session (window contents, baselines, counts) carries over.
    pub fn start_session(&self) -> Result<(), SessionError> {
        let mut guard = self.lock_session()?;
        if guard.is_some() {
            let err = SessionError::AlreadyRunning;
            log_session_error(&err, "start_session");
            return Err(err);
        }

        let tick_tx = self
            .broadcasts
            .get_tick_sender()
            .unwrap_or_else(|| self.broadcasts.init_tick_updates());
        let scan_tx = self
            .broadcasts
            .get_scan_sender()
            .unwrap_or_else(|| self.broadcasts.init_scan_summaries());
        let timing = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .timing
            .clone();

        let ctx = SessionStartContext {
            config: Arc::clone(&self.config),
            timing,
            motion: Arc::clone(&self.motion),
            scanner: Arc::clone(&self.scanner),
            controller: VolumeController::new(Arc::clone(&self.sink)),
            tick_tx,
            scan_tx,
            telemetry: self.telemetry_ctx(),
        };

        *guard = Some(SessionState::spawn(ctx)?);
        drop(guard);

        self.session_running.store(true, Ordering::SeqCst);
        self.emit_event(TelemetryEventKind::SessionStarted, None);
        log::info!("[EngineHandle] Sensing session started");
        Ok(())
    }

    /// Stop the sensing session.
    ///
    /// Joins the scheduler thread before returning, so no already-scheduled
    /// tick can fire afterwards; an in-flight scan window is abandoned.
    pub fn stop_session(&self) -> Result<(), SessionError> {
        let state = {
            let mut guard = self.lock_session()?;
            guard.take()
        };

        let Some(mut state) = state else {
            let err = SessionError::NotRunning;
            log_session_error(&err, "stop_session");
            return Err(err);
        };

        state.shutdown();
        self.scanner.stop();
        self.motion.stop();

        self.session_running.store(false, Ordering::SeqCst);
        self.emit_event(TelemetryEventKind::SessionStopped, None);
        log::info!("[EngineHandle] Sensing session stopped");
        Ok(())
    }

    /// Check whether a sensing session is active.
    pub fn is_running(&self) -> bool {
        self.session_running.load(Ordering::SeqCst)
    }

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    /// Update the output volume bounds.
    ///
    /// Rejected (prior bounds retained) unless `min < max`. Both bounds
    /// change under one write lock, so an output tick can never observe a
    /// half-updated pair.
    pub fn set_volume_bounds(&self, min: u32, max: u32) -> Result<(), ConfigError> {
        if min >= max {
            let err = ConfigError::InvalidBounds { min, max };
            log_config_error(&err, "set_volume_bounds");
            return Err(err);
        }

        {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            config.control.min_volume = min;
            config.control.max_volume = max;
        }

        self.emit_event(TelemetryEventKind::BoundsChanged { min, max }, None);
        log::info!("[EngineHandle] Volume bounds set to [{}, {}]", min, max);
        Ok(())
    }

    /// Select the response curve applied from the next output tick on.
    pub fn set_curve_mode(&self, mode: CurveMode) {
        {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            config.control.curve_mode = mode;
        }

        self.emit_event(TelemetryEventKind::CurveChanged { mode }, None);
        log::info!("[EngineHandle] Curve mode set to {}", mode);
    }

    /// Apply a parameter patch from a tooling surface.
    ///
    /// Bounds are validated as a pair against the current configuration,
    /// so one-sided updates keep the invariant.
    pub fn apply_patch(&self, patch: ParamPatch) -> Result<(), ConfigError> {
        if patch.min_volume.is_some() || patch.max_volume.is_some() {
            let (current_min, current_max) = {
                let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
                (config.control.min_volume, config.control.max_volume)
            };
            let min = patch.min_volume.unwrap_or(current_min);
            let max = patch.max_volume.unwrap_or(current_max);
            self.set_volume_bounds(min, max)?;
        }

        if let Some(mode) = patch.curve_mode {
            self.set_curve_mode(mode);
        }

        Ok(())
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    /// Point-in-time view of the sensing state for diagnostics surfaces.
    pub fn sensing_snapshot(&self) -> SensingSnapshot {
        let guard = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(state) => state.snapshot(self.is_running()),
            None => SensingSnapshot::idle(),
        }
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[path = "core_subscriptions.rs"]
mod core_subscriptions;
