//! Pass 4: mid/side widening above the bass region

use crate::dsp::filter::highpass_in_place;
use crate::types::AudioBuffer;

const SIDE_HIGHPASS_HZ: f64 = 200.0;
const SIDE_HIGHPASS_ORDER: usize = 2;
pub const DEFAULT_WIDTH_AMOUNT: f64 = 0.3;

/// Recompose L/R with the side channel replaced by
/// `side * (1 - amount) + highpass(side) * (1 + amount)`. Mono buffers are
/// left untouched.
pub fn enhance_stereo(buffer: &mut AudioBuffer, amount: f64) {
    if buffer.channels != 2 {
        return;
    }
    let sr = buffer.sample_rate;
    let amount = amount as f32;

    let (left, right) = buffer.samples.split_at_mut(1);
    let (left, right) = (&mut left[0], &mut right[0]);

    let mid: Vec<f32> = left.iter().zip(right.iter()).map(|(l, r)| (l + r) / 2.0).collect();
    let side: Vec<f32> = left.iter().zip(right.iter()).map(|(l, r)| (l - r) / 2.0).collect();

    let mut side_hp = side.clone();
    highpass_in_place(&mut side_hp, SIDE_HIGHPASS_HZ, sr, SIDE_HIGHPASS_ORDER);

    for i in 0..mid.len() {
        let enhanced = side[i] * (1.0 - amount) + side_hp[i] * (1.0 + amount);
        left[i] = mid[i] + enhanced;
        right[i] = mid[i] - enhanced;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_content_stays_mono() {
        let signal: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let mut buffer = AudioBuffer::from_stereo(signal.clone(), signal.clone(), 48_000);
        enhance_stereo(&mut buffer, DEFAULT_WIDTH_AMOUNT);
        assert_eq!(buffer.samples[0], signal);
        assert_eq!(buffer.samples[1], signal);
    }

    #[test]
    fn high_side_content_is_widened() {
        let sr = 48_000;
        let tone: Vec<f32> = (0..sr as usize)
            .map(|i| 0.2 * (2.0 * std::f64::consts::PI * 5000.0 * i as f64 / sr as f64).sin() as f32)
            .collect();
        let silence = vec![0.0_f32; tone.len()];
        let mut buffer = AudioBuffer::from_stereo(tone, silence, sr);
        let before = crate::analysis::metrics::stereo(&buffer.samples[0], &buffer.samples[1]);
        enhance_stereo(&mut buffer, DEFAULT_WIDTH_AMOUNT);
        let after = crate::analysis::metrics::stereo(&buffer.samples[0], &buffer.samples[1]);
        assert!(after.width_percent > before.width_percent);
    }
}
