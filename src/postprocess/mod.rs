//! Post-processors applied between repair and mastering

pub mod humanizer;
pub mod silence_filler;
pub mod textures;

use rand_pcg::Pcg32;

use crate::types::AudioBuffer;

pub use humanizer::{Humanizer, HumanizerSettings};
pub use silence_filler::{AmbientSilenceFiller, FillStyle, SilenceFiller};

/// Whole-buffer transform. Returns a new buffer with the input's layout.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, buffer: &AudioBuffer, rng: &mut Pcg32) -> AudioBuffer;
}
