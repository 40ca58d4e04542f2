//! Pass 3: analog-style saturation with a gentle HF rolloff

use rayon::prelude::*;

use crate::dsp::filter::Biquad;
use crate::types::AudioBuffer;

const ROLLOFF_HZ: f64 = 16_000.0;

/// Asymmetric tanh waveshaper blended with the dry signal at `amount / 2`
pub fn saturate_sample(x: f32, amount: f32) -> f32 {
    let driven = x * (1.0 + amount);
    let shaped = driven.tanh() + (driven * 2.0).tanh() * amount * 0.1;
    x * (1.0 - amount * 0.5) + shaped * (amount * 0.5)
}

pub fn analog_saturation(buffer: &mut AudioBuffer, amount: f64) {
    let sr = buffer.sample_rate;
    let amount = amount as f32;
    let rolloff = Biquad::first_order_lowpass(sr, ROLLOFF_HZ);

    buffer.samples.par_iter_mut().for_each(|channel| {
        channel.iter_mut().for_each(|s| *s = saturate_sample(*s, amount));
        rolloff.process(channel);
    });
}
