//! Renders a whole composition into one candidate buffer

use rand::Rng;
use rand_pcg::Pcg32;
use rayon::prelude::*;
use tracing::debug;

use crate::controller::CandidateSource;
use crate::error::{Error, Result};
use crate::rng::create_derived_rng;
use crate::types::AudioBuffer;

use super::composition::Composition;
use super::mix::{mix, Placement};
use super::synth::{InstrumentRenderer, RenderRequest, SynthRenderer};

/// Tail added after the last note when the composition has no fixed length
const RELEASE_TAIL_SECONDS: f64 = 0.5;

pub struct CompositionSource<R = SynthRenderer> {
    composition: Composition,
    renderer: R,
    sample_rate: u32,
}

impl CompositionSource<SynthRenderer> {
    pub fn new(composition: Composition, sample_rate: u32) -> Self {
        Self::with_renderer(composition, SynthRenderer, sample_rate)
    }
}

impl<R: InstrumentRenderer> CompositionSource<R> {
    pub fn with_renderer(composition: Composition, renderer: R, sample_rate: u32) -> Self {
        Self {
            composition,
            renderer,
            sample_rate,
        }
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    fn requests(&self, variation: f64) -> Vec<RenderRequest> {
        self.composition
            .instructions
            .iter()
            .map(|instruction| RenderRequest {
                instrument: instruction.instrument,
                frequency_hz: instruction.frequency_hz,
                duration_seconds: instruction.duration_seconds,
                velocity: instruction.velocity,
                variation,
                sample_rate: self.sample_rate,
            })
            .collect()
    }
}

impl<R: InstrumentRenderer> CandidateSource for CompositionSource<R> {
    fn synthesize(&self, attempt: usize, variation: f64, rng: &mut Pcg32) -> Result<AudioBuffer> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }
        let sr = self.sample_rate as f64;
        let base_seed: u64 = rng.gen();
        let requests = self.requests(variation);

        // Each layer gets its own stream so rendering order cannot change
        // the result
        let layers: Vec<Vec<f32>> = requests
            .par_iter()
            .enumerate()
            .map(|(i, request)| {
                let mut layer_rng = create_derived_rng(base_seed, i as u64);
                self.renderer.render(request, &mut layer_rng)
            })
            .collect();

        let positions: Vec<Placement> = self
            .composition
            .instructions
            .iter()
            .map(|instruction| Placement::new((instruction.start_seconds * sr).round() as usize, instruction.pan))
            .collect();

        let length = match self.composition.duration_seconds {
            Some(seconds) => (seconds * sr).round() as usize,
            None => {
                let last_end = positions
                    .iter()
                    .zip(&layers)
                    .map(|(p, layer)| p.start_frame + layer.len())
                    .max()
                    .unwrap_or(0);
                last_end + (RELEASE_TAIL_SECONDS * sr) as usize
            }
        };

        debug!(attempt, layers = layers.len(), frames = length, variation, "Rendered candidate");
        Ok(mix(&layers, &positions, length, self.sample_rate))
    }

    fn initial_variation(&self) -> f64 {
        self.composition.variation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    fn composition() -> Composition {
        Composition::from_json(
            r#"{
                "genre": "techno",
                "variation": 0.3,
                "instructions": [
                    { "instrument": "kick", "start_seconds": 0.0 },
                    { "instrument": "hihat", "start_seconds": 0.25, "pan": 0.4 },
                    { "instrument": "bass", "note": "A1", "start_seconds": 0.5, "duration_seconds": 0.5 }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn renders_stereo_candidate_with_tail() {
        let source = CompositionSource::new(composition(), 16_000);
        let buffer = source.synthesize(0, 0.3, &mut create_rng(9)).unwrap();

        assert_eq!(buffer.channels, 2);
        assert_eq!(buffer.sample_rate, 16_000);
        // Kick ends at 0.6 s, bass at 1.0 s, plus the release tail
        assert_eq!(buffer.frame_count(), 16_000 + 8000);
        assert!(buffer.validate_non_empty().is_ok());
        assert_eq!(source.initial_variation(), 0.3);
    }

    #[test]
    fn fixed_duration_truncates() {
        let mut comp = composition();
        comp.duration_seconds = Some(0.4);
        let source = CompositionSource::new(comp, 8000);
        let buffer = source.synthesize(0, 0.3, &mut create_rng(9)).unwrap();
        assert_eq!(buffer.frame_count(), 3200);
    }

    #[test]
    fn attempts_differ_by_seed() {
        let source = CompositionSource::new(composition(), 8000);
        let a = source.synthesize(0, 0.5, &mut create_rng(1)).unwrap();
        let b = source.synthesize(0, 0.5, &mut create_rng(1)).unwrap();
        let c = source.synthesize(1, 0.5, &mut create_rng(2)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
