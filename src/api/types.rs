use serde::{Deserialize, Serialize};

/// Per-tick observer payload emitted by the output cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickUpdate {
    /// Unique devices counted by the most recently completed scan
    pub device_count: u32,
    /// Smoothed ambient motion energy at tick time
    pub vibration_energy: f32,
    /// Crowd score after curve shaping, in [0, 1]
    pub shaped_score: f32,
    /// Volume step the controller asked the sink to apply
    pub target_volume: u32,
    /// Volume step the sink reported after the write; diverges from
    /// `target_volume` when the platform clamped or rejected it
    pub applied_volume: u32,
    /// Milliseconds since the engine handle was created
    pub timestamp_ms: u64,
}

/// Result of one completed (or abandoned) scan window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Unique devices seen in this window; meaningful only when
    /// `scan_completed` is true
    pub device_count: u32,
    /// False when the scanner was unavailable for this window
    pub scan_completed: bool,
    /// Whether this window latched a previously unset baseline
    pub baseline_latched: bool,
    /// Milliseconds since the engine handle was created
    pub timestamp_ms: u64,
}

/// Point-in-time view of the sensing state for diagnostics surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensingSnapshot {
    pub running: bool,
    pub scanning: bool,
    pub device_count: u32,
    pub vibration_energy: f32,
    pub device_baseline: Option<u32>,
    pub vibration_baseline: Option<f32>,
}

impl SensingSnapshot {
    /// Snapshot reported while no session is active.
    pub fn idle() -> Self {
        Self {
            running: false,
            scanning: false,
            device_count: 0,
            vibration_energy: 0.0,
            device_baseline: None,
            vibration_baseline: None,
        }
    }
}
