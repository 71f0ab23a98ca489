//! Fusion of the two per-signal scores into one crowd score.
//!
//! Each signal is first normalized against its baseline into [0, 1]; a
//! signal without a baseline contributes the neutral score instead. The
//! fused result is a fixed weighted sum, clamped back into [0, 1].

/// Weight of the device-density score in the fused result.
/// Device density is the steadier proxy for occupancy.
pub const BLUETOOTH_WEIGHT: f32 = 0.6;

/// Weight of the vibration-energy score in the fused result.
/// Motion energy is noisier and carries less of the total.
pub const VIBRATION_WEIGHT: f32 = 0.4;

/// Score reported for a signal whose baseline is not yet calibrated
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Smallest vibration baseline used as a divisor
pub const MIN_VIBRATION_BASELINE: f32 = 0.001;

/// Normalized device-density score.
///
/// Growth above the baseline maps linearly: a count at twice the baseline
/// saturates the score at 1.0. Counts at or below the baseline score 0.0.
pub fn bluetooth_score(count: usize, baseline: Option<usize>) -> f32 {
    let Some(baseline) = baseline else {
        return NEUTRAL_SCORE;
    };
    let baseline = baseline.max(1) as f32;
    ((count as f32 - baseline) / baseline).clamp(0.0, 1.0)
}

/// Normalized vibration-energy score.
///
/// Energy at the baseline scores 0.0; three times the baseline saturates
/// at 1.0. The baseline divisor is floored to keep near-zero "still room"
/// references from exploding the ratio.
pub fn vibration_score(energy: f32, baseline: Option<f32>) -> f32 {
    let Some(baseline) = baseline else {
        return NEUTRAL_SCORE;
    };
    let baseline = baseline.max(MIN_VIBRATION_BASELINE);
    ((energy / baseline - 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Weighted fusion of the two normalized scores, clamped into [0, 1].
pub fn raw_crowd_score(bt_score: f32, vib_score: f32) -> f32 {
    (BLUETOOTH_WEIGHT * bt_score + VIBRATION_WEIGHT * vib_score).clamp(0.0, 1.0)
}
