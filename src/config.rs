//! Configuration management for the control loop
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling tuning of the volume bounds, response curve, and the sensing
//! cadences without recompilation. Invalid bounds are rejected at this
//! boundary so a running session always observes a consistent config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::sensing::curve::CurveMode;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub control: ControlConfig,
    pub timing: TimingConfig,
}

/// Output-volume steering parameters
///
/// `min_volume`/`max_volume` are platform volume steps; the controller
/// additionally clamps them into the sink's reported range at apply time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Lowest volume step the controller will ever emit
    pub min_volume: u32,
    /// Highest volume step the controller will ever emit
    pub max_volume: u32,
    /// Response curve applied to the fused crowd score
    pub curve_mode: CurveMode,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            min_volume: 3,
            max_volume: 12,
            curve_mode: CurveMode::Medium,
        }
    }
}

impl ControlConfig {
    /// Validate the bounds invariant `min_volume < max_volume`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_volume >= self.max_volume {
            return Err(ConfigError::InvalidBounds {
                min: self.min_volume,
                max: self.max_volume,
            });
        }
        Ok(())
    }
}

/// Cadences for the two periodic session cycles
///
/// The scan cycle and the output cycle run independently: outputs always
/// use the most recently completed scan rather than waiting for a fresh one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Period between scan-cycle starts, in milliseconds
    pub scan_interval_ms: u64,
    /// Length of each scan window, in milliseconds (shorter than the interval)
    pub scan_window_ms: u64,
    /// Period between output ticks, in milliseconds
    pub output_interval_ms: u64,
    /// Delay before the first output tick, in milliseconds
    pub output_initial_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 30_000,
            scan_window_ms: 8_000,
            output_interval_ms: 5_000,
            output_initial_delay_ms: 5_000,
        }
    }
}

impl TimingConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn scan_window(&self) -> Duration {
        Duration::from_millis(self.scan_window_ms)
    }

    pub fn output_interval(&self) -> Duration {
        Duration::from_millis(self.output_interval_ms)
    }

    pub fn output_initial_delay(&self) -> Duration {
        Duration::from_millis(self.output_initial_delay_ms)
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or defaults (with a warning) if the file is
    /// missing, unparseable, or carries invalid bounds.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    if let Err(err) = config.control.validate() {
                        log::warn!(
                            "[Config] Rejecting config from {:?}: {}. Using defaults.",
                            path.as_ref(),
                            err
                        );
                        return Self::default();
                    }
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default assets location
    pub fn load() -> Self {
        Self::load_from_file("assets/vibe_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.control.min_volume, 3);
        assert_eq!(config.control.max_volume, 12);
        assert_eq!(config.control.curve_mode, CurveMode::Medium);
        assert_eq!(config.timing.scan_interval_ms, 30_000);
        assert_eq!(config.timing.scan_window_ms, 8_000);
        assert_eq!(config.timing.output_interval_ms, 5_000);
        assert_eq!(config.timing.output_initial_delay_ms, 5_000);
    }

    #[test]
    fn test_default_bounds_are_valid() {
        assert!(ControlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let config = ControlConfig {
            min_volume: 9,
            max_volume: 9,
            curve_mode: CurveMode::Medium,
        };
        assert!(config.validate().is_err());

        let config = ControlConfig {
            min_volume: 10,
            max_volume: 4,
            curve_mode: CurveMode::Aggressive,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.control.min_volume, config.control.min_volume);
        assert_eq!(parsed.control.max_volume, config.control.max_volume);
        assert_eq!(parsed.control.curve_mode, config.control.curve_mode);
        assert_eq!(parsed.timing.scan_window_ms, config.timing.scan_window_ms);
    }

    #[test]
    fn test_curve_mode_serializes_snake_case() {
        let json = serde_json::to_string(&CurveMode::Aggressive).unwrap();
        assert_eq!(json, "\"aggressive\"");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/vibe_config.json");
        assert_eq!(config.control.min_volume, 3);
        assert_eq!(config.control.max_volume, 12);
    }

    #[test]
    fn test_timing_durations() {
        let timing = TimingConfig::default();
        assert_eq!(timing.scan_interval(), Duration::from_secs(30));
        assert_eq!(timing.scan_window(), Duration::from_secs(8));
        assert_eq!(timing.output_interval(), Duration::from_secs(5));
        assert_eq!(timing.output_initial_delay(), Duration::from_secs(5));
    }
}
