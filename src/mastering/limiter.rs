//! Pass 5: loudness gain staging and the look-ahead peak limiter

use std::collections::VecDeque;

use tracing::debug;

use crate::dsp::envelope::time_constant_coef;
use crate::dsp::level::db_to_linear;
use crate::dsp::loudness::{integrated_loudness, SILENCE_LUFS};
use crate::types::AudioBuffer;

/// Output ceiling, about -0.45 dBFS
pub const CEILING: f32 = 0.95;
/// Largest pre-gain boost (about +9.5 dB)
pub const MAX_GAIN_LINEAR: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limiter {
    pub ceiling: f32,
    pub lookahead_ms: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
}

impl Default for Limiter {
    fn default() -> Self {
        Self {
            ceiling: CEILING,
            lookahead_ms: 5.0,
            attack_ms: 1.0,
            release_ms: 50.0,
        }
    }
}

impl Limiter {
    /// Stereo-linked limiting. The gain at each frame is computed from the
    /// loudest frame in the window reaching `lookahead` frames ahead, which
    /// is the offline equivalent of delaying the audio by the lookahead.
    /// After smoothing, the gain never exceeds the instantaneous
    /// requirement, so no output sample exceeds the ceiling.
    pub fn process(&self, buffer: &mut AudioBuffer) {
        let frames = buffer.frame_count();
        if frames == 0 {
            return;
        }
        let sr = buffer.sample_rate;
        let ceiling = self.ceiling as f64;
        let lookahead = ((self.lookahead_ms * sr as f64 / 1000.0) as usize).max(1);

        let required: Vec<f64> = (0..frames)
            .map(|i| {
                let peak = buffer
                    .samples
                    .iter()
                    .map(|ch| ch[i].abs())
                    .fold(0.0_f32, f32::max) as f64;
                if peak > ceiling {
                    ceiling / peak
                } else {
                    1.0
                }
            })
            .collect();

        let target = forward_min(&required, lookahead);

        let attack = time_constant_coef(self.attack_ms, sr);
        let release = time_constant_coef(self.release_ms, sr);
        let mut smoothed = target[0];
        let gain: Vec<f32> = target
            .iter()
            .zip(&required)
            .map(|(&t, &req)| {
                let coef = if t < smoothed { attack } else { release };
                smoothed = coef * smoothed + (1.0 - coef) * t;
                smoothed.min(req) as f32
            })
            .collect();

        let limit = self.ceiling;
        for channel in &mut buffer.samples {
            for (s, &g) in channel.iter_mut().zip(&gain) {
                *s = (*s * g).clamp(-limit, limit);
            }
        }
    }
}

/// `out[i] = min(values[i..=i + window])`, via a monotonic deque
fn forward_min(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![1.0; n];
    let mut deque: VecDeque<usize> = VecDeque::new();

    // Walk backwards so the deque always covers [i, i + window]
    for i in (0..n).rev() {
        while let Some(&back) = deque.back() {
            if values[back] >= values[i] {
                deque.pop_back();
            } else {
                break;
            }
        }
        deque.push_back(i);
        while let Some(&front) = deque.front() {
            if front > i + window {
                deque.pop_front();
            } else {
                break;
            }
        }
        if let Some(&front) = deque.front() {
            out[i] = values[front];
        }
    }
    out
}

/// Linear pre-gain that moves the integrated loudness to `target_lufs`,
/// capped at `MAX_GAIN_LINEAR`. Material below the loudness gate gets no
/// gain.
pub fn loudness_gain(buffer: &AudioBuffer, target_lufs: f64) -> f64 {
    let current = integrated_loudness(buffer);
    if current <= SILENCE_LUFS {
        debug!("Input below loudness gate, skipping make-up gain");
        return 1.0;
    }
    let gain = db_to_linear(target_lufs - current).min(MAX_GAIN_LINEAR);
    debug!("Loudness {:.2} LUFS -> target {:.2} LUFS, gain x{:.3}", current, target_lufs, gain);
    gain
}

/// Pre-gain to the loudness target, then limit
pub fn loudness_maximize(buffer: &mut AudioBuffer, target_lufs: f64, limiter: &Limiter) {
    let gain = loudness_gain(buffer, target_lufs) as f32;
    if gain != 1.0 {
        for channel in &mut buffer.samples {
            channel.iter_mut().for_each(|s| *s *= gain);
        }
    }
    limiter.process(buffer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_min_matches_brute_force() {
        let values = [1.0, 0.5, 0.9, 1.0, 0.2, 1.0, 1.0, 0.7];
        let window = 2;
        let fast = forward_min(&values, window);
        for i in 0..values.len() {
            let end = (i + window + 1).min(values.len());
            let brute = values[i..end].iter().cloned().fold(f64::MAX, f64::min);
            assert_eq!(fast[i], brute, "index {i}");
        }
    }

    #[test]
    fn hot_signal_never_exceeds_ceiling() {
        let sr = 48_000;
        let left: Vec<f32> = (0..sr as usize)
            .map(|i| 4.0 * (2.0 * std::f64::consts::PI * 220.0 * i as f64 / sr as f64).sin() as f32)
            .collect();
        let right: Vec<f32> = left.iter().map(|s| s * -0.5).collect();
        let mut buffer = AudioBuffer::from_stereo(left, right, sr);
        Limiter::default().process(&mut buffer);
        for ch in &buffer.samples {
            assert!(ch.iter().all(|s| s.abs() <= CEILING));
        }
    }

    #[test]
    fn quiet_signal_passes_untouched() {
        let samples: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.03).sin() * 0.5).collect();
        let mut buffer = AudioBuffer::from_mono(samples.clone(), 48_000);
        Limiter::default().process(&mut buffer);
        assert_eq!(buffer.samples[0], samples);
    }

    #[test]
    fn silence_gets_no_gain() {
        let buffer = AudioBuffer::silent(2, 48_000, 48_000);
        assert_eq!(loudness_gain(&buffer, -11.0), 1.0);
    }
}
