//! Pass 1: corrective EQ, DC removal, resonance taming

use rayon::prelude::*;

use crate::analysis::metrics::BALANCE_BANDS;
use crate::dsp::filter::{bandpass, Biquad};
use crate::types::AudioBuffer;

use super::style::BandGains;

const BAND_ORDER: usize = 4;

/// Known problem frequencies, in Hz
pub const RESONANCE_FREQS: [f64; 5] = [120.0, 240.0, 500.0, 1000.0, 2500.0];
const NOTCH_Q: f64 = 20.0;
/// Share of the notched signal in each blend
const NOTCH_MIX: f32 = 0.1;

/// Split each channel into the six balance bands (zero-phase), scale each
/// band by its gain and sum back
pub fn multiband_eq(buffer: &mut AudioBuffer, gains: &BandGains) {
    let sr = buffer.sample_rate;
    buffer.samples.par_iter_mut().for_each(|channel| {
        *channel = split_and_sum(channel, sr, gains);
    });
}

fn split_and_sum(channel: &[f32], sample_rate: u32, gains: &BandGains) -> Vec<f32> {
    let bands: Vec<Vec<f32>> = BALANCE_BANDS
        .par_iter()
        .zip(gains.par_iter())
        .map(|(&(low, high), &gain)| {
            let mut band = bandpass(channel, low, high, sample_rate, BAND_ORDER);
            let gain = gain as f32;
            band.iter_mut().for_each(|s| *s *= gain);
            band
        })
        .collect();

    let mut output = vec![0.0_f32; channel.len()];
    for band in &bands {
        for (out, &s) in output.iter_mut().zip(band) {
            *out += s;
        }
    }
    output
}

/// Subtract the per-channel mean
pub fn remove_dc_offset(buffer: &mut AudioBuffer) {
    buffer.samples.par_iter_mut().for_each(|channel| {
        if channel.is_empty() {
            return;
        }
        let mean = (channel.iter().map(|&s| s as f64).sum::<f64>() / channel.len() as f64) as f32;
        channel.iter_mut().for_each(|s| *s -= mean);
    });
}

/// Narrow notches at the fixed resonance list, each blended in at 10%
pub fn tame_resonances(buffer: &mut AudioBuffer) {
    let sr = buffer.sample_rate;
    buffer.samples.par_iter_mut().for_each(|channel| {
        for &freq in &RESONANCE_FREQS {
            let mut notched = channel.clone();
            Biquad::notch(sr, freq, NOTCH_Q).process(&mut notched);
            for (dry, wet) in channel.iter_mut().zip(&notched) {
                *dry = *dry * (1.0 - NOTCH_MIX) + wet * NOTCH_MIX;
            }
        }
    });
}
