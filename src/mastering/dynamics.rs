//! Pass 2: three-band compression and parallel ("New York") compression

use rayon::prelude::*;

use crate::dsp::envelope::envelope_follower;
use crate::dsp::filter::bandpass;
use crate::types::AudioBuffer;

use super::style::ParallelSettings;

const BAND_ORDER: usize = 4;

/// Feed-forward compressor with a linear threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compressor {
    pub threshold: f64,
    pub ratio: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
    /// Scale so a full-scale envelope comes out at full scale
    pub makeup: bool,
}

impl Compressor {
    /// Gain for a given envelope level
    pub fn gain(&self, envelope: f64) -> f64 {
        let slope = 1.0 - 1.0 / self.ratio.max(1.0);
        let reduction = if envelope > self.threshold {
            (self.threshold / envelope).powf(slope)
        } else {
            1.0
        };
        if self.makeup {
            reduction * (1.0 / self.threshold).powf(slope)
        } else {
            reduction
        }
    }

    pub fn process(&self, samples: &[f32], sample_rate: u32) -> Vec<f32> {
        let envelope = envelope_follower(samples, self.attack_ms, self.release_ms, sample_rate);
        samples
            .iter()
            .zip(&envelope)
            .map(|(&s, &env)| (s as f64 * self.gain(env as f64)) as f32)
            .collect()
    }
}

/// (low Hz, high Hz, compressor) for the low, mid and high bands
pub const MULTIBAND: [(f64, f64, Compressor); 3] = [
    (
        20.0,
        250.0,
        Compressor { threshold: 0.6, ratio: 3.0, attack_ms: 10.0, release_ms: 100.0, makeup: false },
    ),
    (
        250.0,
        2000.0,
        Compressor { threshold: 0.5, ratio: 4.0, attack_ms: 5.0, release_ms: 50.0, makeup: false },
    ),
    (
        2000.0,
        20000.0,
        Compressor { threshold: 0.4, ratio: 3.5, attack_ms: 1.0, release_ms: 30.0, makeup: false },
    ),
];

pub fn multiband_compression(buffer: &mut AudioBuffer) {
    let sr = buffer.sample_rate;
    buffer.samples.par_iter_mut().for_each(|channel| {
        let bands: Vec<Vec<f32>> = MULTIBAND
            .par_iter()
            .map(|(low, high, comp)| comp.process(&bandpass(channel, *low, *high, sr, BAND_ORDER), sr))
            .collect();

        channel.iter_mut().for_each(|s| *s = 0.0);
        for band in &bands {
            for (out, &s) in channel.iter_mut().zip(band) {
                *out += s;
            }
        }
    });
}

const PARALLEL_ATTACK_MS: f64 = 3.0;
const PARALLEL_RELEASE_MS: f64 = 80.0;

/// Blend a heavily compressed copy under the dry signal
pub fn parallel_compression(buffer: &mut AudioBuffer, settings: &ParallelSettings) {
    let sr = buffer.sample_rate;
    let comp = Compressor {
        threshold: settings.threshold,
        ratio: settings.ratio,
        attack_ms: PARALLEL_ATTACK_MS,
        release_ms: PARALLEL_RELEASE_MS,
        makeup: true,
    };
    let mix = settings.mix as f32;

    buffer.samples.par_iter_mut().for_each(|channel| {
        let wet = comp.process(channel, sr);
        for (dry, w) in channel.iter_mut().zip(wet) {
            *dry = *dry * (1.0 - mix) + w * mix;
        }
    });
}
