//! Volume steering from shaped crowd scores.

pub mod volume;

pub use volume::{target_step, AppliedVolume, VolumeController};
