// Public control surface for embedding hosts
//
// This module exposes the process-wide engine handle and thin functions
// over it: session start/stop, bounds and curve updates, and observer
// subscriptions. Hosts that want several engines construct their own
// EngineHandle instances instead.

use once_cell::sync::Lazy;
use tokio::sync::mpsc;

use crate::engine::core::{EngineHandle, TelemetryEvent};
use crate::error::{ConfigError, SessionError};
use crate::sensing::curve::CurveMode;

pub mod types;

pub use types::{ScanSummary, SensingSnapshot, TickUpdate};

/// Process-wide engine handle over the default backends.
pub static ENGINE_HANDLE: Lazy<EngineHandle> = Lazy::new(EngineHandle::new);

/// Borrow the process-wide engine handle.
pub fn handle() -> &'static EngineHandle {
    &ENGINE_HANDLE
}

/// Start the sensing session.
pub fn start_session() -> Result<(), SessionError> {
    ENGINE_HANDLE.start_session()
}

/// Stop the sensing session.
pub fn stop_session() -> Result<(), SessionError> {
    ENGINE_HANDLE.stop_session()
}

/// Check whether the sensing session is running.
pub fn is_session_running() -> bool {
    ENGINE_HANDLE.is_running()
}

/// Update the output volume bounds (rejected unless min < max).
pub fn set_volume_bounds(min: u32, max: u32) -> Result<(), ConfigError> {
    ENGINE_HANDLE.set_volume_bounds(min, max)
}

/// Select the response curve applied from the next output tick on.
pub fn set_curve_mode(mode: CurveMode) {
    ENGINE_HANDLE.set_curve_mode(mode)
}

/// Subscribe to per-tick observer updates.
pub fn subscribe_tick_updates() -> mpsc::UnboundedReceiver<TickUpdate> {
    ENGINE_HANDLE.subscribe_tick_updates()
}

/// Subscribe to per-scan summaries.
pub fn subscribe_scan_summaries() -> mpsc::UnboundedReceiver<ScanSummary> {
    ENGINE_HANDLE.subscribe_scan_summaries()
}

/// Subscribe to engine lifecycle telemetry.
pub fn subscribe_telemetry() -> mpsc::UnboundedReceiver<TelemetryEvent> {
    ENGINE_HANDLE.subscribe_telemetry()
}

/// Point-in-time sensing state for diagnostics surfaces.
pub fn sensing_snapshot() -> SensingSnapshot {
    ENGINE_HANDLE.sensing_snapshot()
}
