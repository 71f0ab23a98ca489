//! Signal estimation: vibration energy, crowd density, baselines, and
//! the fusion/shaping math that turns them into one crowd score.

pub mod baseline;
pub mod curve;
pub mod density;
pub mod fusion;
pub mod vibration;

pub use baseline::Baseline;
pub use curve::{shape, CurveMode};
pub use density::CrowdDensityEstimator;
pub use fusion::{bluetooth_score, raw_crowd_score, vibration_score, NEUTRAL_SCORE};
pub use vibration::{VibrationEstimator, VIBRATION_WINDOW_SIZE};
