//! Response curves mapping the fused crowd score to an output position.
//!
//! All three curves are monotonic non-decreasing on [0, 1] and keep the
//! fixed points shape(0) = 0 and shape(1) = 1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Selects how quickly the output volume reacts to a growing crowd.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveMode {
    /// Square-root curve: rises fast for the first arrivals, then flattens
    /// toward the ceiling.
    Gradual,
    /// Identity curve: output tracks the crowd score proportionally.
    #[default]
    Medium,
    /// Squared curve: stays near the floor until the crowd is substantial,
    /// then surges.
    Aggressive,
}

impl CurveMode {
    /// Short user-facing summary of the curve's character.
    pub fn description(&self) -> &'static str {
        match self {
            CurveMode::Gradual => {
                "Smooth ramp that reacts early and saturates well before the ceiling"
            }
            CurveMode::Medium => "Balanced response that tracks crowd growth proportionally",
            CurveMode::Aggressive => {
                "Holds back on small crowds and pushes toward the ceiling once the room fills"
            }
        }
    }
}

impl fmt::Display for CurveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CurveMode::Gradual => "gradual",
            CurveMode::Medium => "medium",
            CurveMode::Aggressive => "aggressive",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CurveMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "gradual" => Ok(CurveMode::Gradual),
            "medium" => Ok(CurveMode::Medium),
            "aggressive" => Ok(CurveMode::Aggressive),
            other => Err(format!(
                "unknown curve mode '{}' (expected gradual, medium, or aggressive)",
                other
            )),
        }
    }
}

/// Shape a raw crowd score through the selected response curve.
///
/// Input and output are both confined to [0, 1]. Non-finite input is
/// treated as 0.0 so a pathological score upstream can never produce a
/// non-finite output position.
pub fn shape(raw: f32, mode: CurveMode) -> f32 {
    let raw = if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    };
    match mode {
        CurveMode::Gradual => raw.sqrt().clamp(0.0, 1.0),
        CurveMode::Medium => raw,
        CurveMode::Aggressive => (raw * raw).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [CurveMode; 3] = [CurveMode::Gradual, CurveMode::Medium, CurveMode::Aggressive];

    #[test]
    fn test_fixed_points() {
        for mode in MODES {
            assert_eq!(shape(0.0, mode), 0.0, "shape(0) for {}", mode);
            assert_eq!(shape(1.0, mode), 1.0, "shape(1) for {}", mode);
        }
    }

    #[test]
    fn test_output_stays_in_unit_interval() {
        for mode in MODES {
            for i in 0..=100 {
                let raw = i as f32 / 100.0;
                let shaped = shape(raw, mode);
                assert!(
                    (0.0..=1.0).contains(&shaped),
                    "shape({}, {}) = {} out of range",
                    raw,
                    mode,
                    shaped
                );
            }
        }
    }

    #[test]
    fn test_monotonic_non_decreasing() {
        for mode in MODES {
            let mut previous = shape(0.0, mode);
            for i in 1..=100 {
                let shaped = shape(i as f32 / 100.0, mode);
                assert!(
                    shaped >= previous,
                    "{} not monotonic at step {}",
                    mode,
                    i
                );
                previous = shaped;
            }
        }
    }

    #[test]
    fn test_midpoint_characters() {
        assert!((shape(0.5, CurveMode::Gradual) - 0.5f32.sqrt()).abs() < 1e-6);
        assert_eq!(shape(0.5, CurveMode::Medium), 0.5);
        assert!((shape(0.5, CurveMode::Aggressive) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_input_treated_as_floor() {
        for mode in MODES {
            assert_eq!(shape(f32::NAN, mode), 0.0);
            assert_eq!(shape(f32::INFINITY, mode), 0.0);
            assert_eq!(shape(f32::NEG_INFINITY, mode), 0.0);
        }
    }

    #[test]
    fn test_out_of_range_input_clamped() {
        for mode in MODES {
            assert_eq!(shape(-0.5, mode), 0.0);
            assert_eq!(shape(1.5, mode), 1.0);
        }
    }

    #[test]
    fn test_mode_round_trip_through_str() {
        for mode in MODES {
            let parsed: CurveMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
        assert!("linear".parse::<CurveMode>().is_err());
    }
}
