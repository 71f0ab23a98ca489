//! Output volume steering.
//!
//! Maps the shaped crowd score linearly into the configured [min, max]
//! step range, writes the target to the platform sink, and reads the
//! applied level back. The platform may clamp or reject the write; the
//! read-back is what observers see, never the assumed target.

use std::sync::Arc;

use crate::engine::backend::VolumeSink;
use crate::error::log_sensing_error;

/// Requested target step and the level the sink actually reports after
/// the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedVolume {
    pub requested: u32,
    pub applied: u32,
}

/// Compute the target volume step for a shaped score.
///
/// The result is always within [min, max]; a score of 0.0 yields exactly
/// `min` and 1.0 yields exactly `max`. Non-finite scores are treated as
/// 0.0 so a pathological upstream value can never push the volume out of
/// the configured range.
pub fn target_step(shaped: f32, min: u32, max: u32) -> u32 {
    let shaped = if shaped.is_finite() {
        shaped.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let span = max.saturating_sub(min) as f32;
    let target = min as f32 + span * shaped;
    (target.round() as u32).clamp(min, max)
}

/// Applies shaped scores to a platform volume sink
#[derive(Clone)]
pub struct VolumeController {
    sink: Arc<dyn VolumeSink>,
}

impl VolumeController {
    pub fn new(sink: Arc<dyn VolumeSink>) -> Self {
        Self { sink }
    }

    /// Write the target step for `shaped` and read back the applied level.
    ///
    /// The configured bounds are clamped into the sink's reported range
    /// first. A rejected write is logged and surfaces only through the
    /// divergence between `requested` and `applied`.
    pub fn apply(&self, shaped: f32, min_volume: u32, max_volume: u32) -> AppliedVolume {
        let (floor, ceiling) = self.sink.range();
        let min = min_volume.clamp(floor, ceiling);
        let max = max_volume.clamp(floor, ceiling).max(min);

        let requested = target_step(shaped, min, max);
        if let Err(err) = self.sink.set_level(requested) {
            log_sensing_error(&err, "volume_apply");
        }
        let applied = self.sink.level();

        AppliedVolume { requested, applied }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::sim::SimVolumeSink;

    #[test]
    fn test_boundary_scores_hit_exact_bounds() {
        assert_eq!(target_step(0.0, 3, 12), 3);
        assert_eq!(target_step(1.0, 3, 12), 12);
    }

    #[test]
    fn test_midrange_score_rounds() {
        // 3 + 9 * 0.8 = 10.2 rounds down to 10.
        assert_eq!(target_step(0.8, 3, 12), 10);
        // 3 + 9 * 0.5 = 7.5 rounds up to 8.
        assert_eq!(target_step(0.5, 3, 12), 8);
    }

    #[test]
    fn test_target_always_within_bounds() {
        for i in 0..=100 {
            let shaped = i as f32 / 100.0;
            let step = target_step(shaped, 2, 14);
            assert!((2..=14).contains(&step));
        }
    }

    #[test]
    fn test_pathological_scores_fall_to_min() {
        assert_eq!(target_step(f32::NAN, 3, 12), 3);
        assert_eq!(target_step(f32::NEG_INFINITY, 3, 12), 3);
        assert_eq!(target_step(-2.0, 3, 12), 3);
        assert_eq!(target_step(f32::INFINITY, 3, 12), 12);
        assert_eq!(target_step(7.0, 3, 12), 12);
    }

    #[test]
    fn test_degenerate_range_is_stable() {
        assert_eq!(target_step(0.7, 5, 5), 5);
    }

    #[test]
    fn test_apply_writes_and_reads_back() {
        let sink = Arc::new(SimVolumeSink::new(15));
        let controller = VolumeController::new(Arc::clone(&sink) as Arc<dyn VolumeSink>);

        let outcome = controller.apply(1.0, 3, 12);
        assert_eq!(outcome.requested, 12);
        assert_eq!(outcome.applied, 12);
        assert_eq!(sink.level(), 12);
    }

    #[test]
    fn test_apply_clamps_bounds_into_sink_range() {
        let sink = Arc::new(SimVolumeSink::new(10));
        let controller = VolumeController::new(Arc::clone(&sink) as Arc<dyn VolumeSink>);

        // Configured ceiling above the platform ceiling collapses to it.
        let outcome = controller.apply(1.0, 3, 40);
        assert_eq!(outcome.requested, 10);
        assert_eq!(outcome.applied, 10);
    }

    #[test]
    fn test_rejected_write_surfaces_as_divergence() {
        let sink = Arc::new(SimVolumeSink::new(15));
        sink.set_fail_writes(true);
        let controller = VolumeController::new(Arc::clone(&sink) as Arc<dyn VolumeSink>);

        let outcome = controller.apply(1.0, 3, 12);
        assert_eq!(outcome.requested, 12);
        // The sink never accepted the write; the read-back exposes it.
        assert_eq!(outcome.applied, 0);
        assert_ne!(outcome.requested, outcome.applied);
    }
}
