//! One-shot "empty room" baselines.
//!
//! Each signal is normalized against the first reading observed after the
//! session starts. The latch is deliberately one-shot: once people begin
//! arriving, later readings must not retroactively move the reference.

/// Frozen per-signal reference values
///
/// Both latches start unset and are set independently; calibrating one
/// signal never blocks the other. A latch set once stays immutable for
/// the rest of the session.
#[derive(Debug, Default)]
pub struct Baseline {
    device_count: Option<usize>,
    vibration: Option<f32>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the device-count baseline if it has not been set yet.
    /// Returns whether this call performed the latch.
    pub fn record_device_baseline_if_unset(&mut self, count: usize) -> bool {
        if self.device_count.is_some() {
            return false;
        }
        self.device_count = Some(count);
        true
    }

    /// Latch the vibration baseline if it has not been set yet.
    /// Returns whether this call performed the latch.
    pub fn record_vibration_baseline_if_unset(&mut self, energy: f32) -> bool {
        if self.vibration.is_some() {
            return false;
        }
        self.vibration = Some(energy);
        true
    }

    pub fn device_count(&self) -> Option<usize> {
        self.device_count
    }

    pub fn vibration(&self) -> Option<f32> {
        self.vibration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unset() {
        let baseline = Baseline::new();
        assert_eq!(baseline.device_count(), None);
        assert_eq!(baseline.vibration(), None);
    }

    #[test]
    fn test_first_record_latches() {
        let mut baseline = Baseline::new();
        assert!(baseline.record_device_baseline_if_unset(4));
        assert!(baseline.record_vibration_baseline_if_unset(0.02));
        assert_eq!(baseline.device_count(), Some(4));
        assert_eq!(baseline.vibration(), Some(0.02));
    }

    #[test]
    fn test_later_records_are_ignored() {
        let mut baseline = Baseline::new();
        assert!(baseline.record_device_baseline_if_unset(4));
        assert!(!baseline.record_device_baseline_if_unset(40));
        assert!(!baseline.record_device_baseline_if_unset(0));
        assert_eq!(baseline.device_count(), Some(4));

        assert!(baseline.record_vibration_baseline_if_unset(0.5));
        assert!(!baseline.record_vibration_baseline_if_unset(99.0));
        assert_eq!(baseline.vibration(), Some(0.5));
    }

    #[test]
    fn test_latches_are_independent() {
        let mut baseline = Baseline::new();
        assert!(baseline.record_vibration_baseline_if_unset(0.1));
        assert_eq!(baseline.device_count(), None);
        assert_eq!(baseline.vibration(), Some(0.1));

        assert!(baseline.record_device_baseline_if_unset(7));
        assert_eq!(baseline.device_count(), Some(7));
    }

    #[test]
    fn test_zero_values_still_latch() {
        let mut baseline = Baseline::new();
        assert!(baseline.record_device_baseline_if_unset(0));
        assert!(baseline.record_vibration_baseline_if_unset(0.0));
        assert!(!baseline.record_device_baseline_if_unset(5));
        assert_eq!(baseline.device_count(), Some(0));
        assert_eq!(baseline.vibration(), Some(0.0));
    }
}
