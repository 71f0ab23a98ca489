// Error types for the VibeVolume control core
//
// This module defines custom error types for session lifecycle, signal
// acquisition, and configuration operations, providing structured error
// handling with error codes suitable for surfacing over CLI/HTTP.

use log::error;
use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the control surface.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=EngineHandle, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Log a sensing error with structured context
///
/// Sensing errors are never fatal to a running session; callers log them
/// and continue with the affected signal degraded toward neutral.
pub fn log_sensing_error(err: &SensingError, context: &str) {
    error!(
        "Sensing error in {}: code={}, component=Session, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=ControlConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session lifecycle errors
///
/// These errors cover starting and stopping the sensing session and
/// access to its shared state.
///
/// Error code ranges: 1001-1004
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A sensing session is already running
    AlreadyRunning,

    /// No sensing session is running
    NotRunning,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// The scheduler thread could not be spawned
    SchedulerUnavailable { details: String },
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::AlreadyRunning => 1001,
            SessionError::NotRunning => 1002,
            SessionError::LockPoisoned { .. } => 1003,
            SessionError::SchedulerUnavailable { .. } => 1004,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::AlreadyRunning => {
                "Sensing session already running. Call stop_session() first.".to_string()
            }
            SessionError::NotRunning => {
                "Sensing session not running. Call start_session() first.".to_string()
            }
            SessionError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            SessionError::SchedulerUnavailable { details } => {
                format!("Failed to spawn scheduler thread: {}", details)
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

/// Signal acquisition and output errors
///
/// These errors cover the platform collaborators: the motion source, the
/// proximity scanner, and the volume sink. None of them stops a running
/// session; the affected signal is held at its neutral score instead.
///
/// Error code ranges: 2001-2004
#[derive(Debug, Clone, PartialEq)]
pub enum SensingError {
    /// Scan permission denied; Bluetooth density stays neutral for the session
    PermissionDenied,

    /// No motion sensor available; vibration energy stays neutral for the session
    SensorUnavailable,

    /// A signal source failed after starting
    SourceFailed { details: String },

    /// The volume sink rejected a level write
    SinkWriteFailure { step: u32, details: String },
}

impl ErrorCode for SensingError {
    fn code(&self) -> i32 {
        match self {
            SensingError::PermissionDenied => 2001,
            SensingError::SensorUnavailable => 2002,
            SensingError::SourceFailed { .. } => 2003,
            SensingError::SinkWriteFailure { .. } => 2004,
        }
    }

    fn message(&self) -> String {
        match self {
            SensingError::PermissionDenied => "Proximity scan permission denied".to_string(),
            SensingError::SensorUnavailable => "Motion sensor unavailable".to_string(),
            SensingError::SourceFailed { details } => {
                format!("Signal source failed: {}", details)
            }
            SensingError::SinkWriteFailure { step, details } => {
                format!("Volume sink rejected step {}: {}", step, details)
            }
        }
    }
}

impl fmt::Display for SensingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SensingError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SensingError {}

/// Convert from std::io::Error to SensingError
impl From<std::io::Error> for SensingError {
    fn from(err: std::io::Error) -> Self {
        SensingError::SourceFailed {
            details: err.to_string(),
        }
    }
}

/// Configuration errors
///
/// Invalid configuration is rejected at the boundary; the previously valid
/// configuration is retained.
///
/// Error code range: 3001
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Volume bounds must satisfy min < max
    InvalidBounds { min: u32, max: u32 },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidBounds { .. } => 3001,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::InvalidBounds { min, max } => {
                format!("Volume bounds invalid: min {} must be below max {}", min, max)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
