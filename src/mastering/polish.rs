//! Pass 6: air shelf and TPDF dither

use rand::Rng;
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::dsp::filter::Biquad;
use crate::error::{Error, Result};
use crate::rng::create_derived_rng;
use crate::types::AudioBuffer;

use super::limiter::Limiter;

const AIR_SHELF_HZ: f64 = 12_000.0;
const AIR_SHELF_Q: f64 = 0.7;
const AIR_SHELF_GAIN_DB: f64 = 0.5;

/// Gentle high-shelf boost. The limiter runs again afterwards so the shelf
/// cannot push peaks back over the ceiling.
pub fn air(buffer: &mut AudioBuffer, limiter: &Limiter) {
    let shelf = Biquad::high_shelf(buffer.sample_rate, AIR_SHELF_HZ, AIR_SHELF_GAIN_DB, AIR_SHELF_Q);
    buffer.samples.par_iter_mut().for_each(|channel| shelf.process(channel));
    limiter.process(buffer);
}

/// One least significant bit at the given export depth; `None` for float
/// output, which needs no dither
pub fn lsb(bit_depth: u16) -> Result<Option<f32>> {
    match bit_depth {
        16 | 24 => Ok(Some(1.0 / (1u32 << (bit_depth - 1)) as f32)),
        32 => Ok(None),
        other => Err(Error::UnsupportedBitDepth(other)),
    }
}

/// Triangular-PDF noise in [-lsb, lsb]: the difference of two uniforms
pub fn tpdf_noise(rng: &mut Pcg32, lsb: f32) -> f32 {
    (rng.gen::<f32>() - rng.gen::<f32>()) * lsb
}

/// Add TPDF dither for the export depth. Each channel draws from its own
/// stream derived from `seed`.
pub fn dither(buffer: &mut AudioBuffer, bit_depth: u16, seed: u64) -> Result<()> {
    let Some(step) = lsb(bit_depth)? else {
        return Ok(());
    };
    buffer
        .samples
        .par_iter_mut()
        .enumerate()
        .for_each(|(ch, channel)| {
            let mut rng = create_derived_rng(seed, ch as u64);
            channel.iter_mut().for_each(|s| *s += tpdf_noise(&mut rng, step));
        });
    Ok(())
}
