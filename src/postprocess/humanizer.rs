//! Humanization: pitch wobble, timing drift, velocity drift, groove
//! emphasis and analog warmth

use std::f64::consts::PI;

use rand::Rng;
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::dsp::envelope::envelope_follower;
use crate::dsp::filter::{apply_cascade, butterworth_highpass, Biquad};
use crate::dsp::level::peak_abs;
use crate::dsp::noise::white;
use crate::rng::create_derived_rng;
use crate::types::AudioBuffer;

use super::PostProcessor;

/// Amounts in [0, 1]; zero disables a stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumanizerSettings {
    pub timing_drift: f64,
    pub velocity_variation: f64,
    pub pitch_wobble: f64,
    pub groove_amount: f64,
    pub analog_warmth: f64,
    pub bpm: f64,
}

impl Default for HumanizerSettings {
    fn default() -> Self {
        Self {
            timing_drift: 0.6,
            velocity_variation: 0.35,
            pitch_wobble: 0.25,
            groove_amount: 0.6,
            analog_warmth: 0.5,
            bpm: 120.0,
        }
    }
}

impl HumanizerSettings {
    /// Slightly different amounts for the right channel so the sides drift
    /// independently
    fn right_channel(&self) -> Self {
        Self {
            timing_drift: self.timing_drift * 0.95,
            velocity_variation: self.velocity_variation * 1.05,
            pitch_wobble: self.pitch_wobble * 1.02,
            groove_amount: self.groove_amount * 0.98,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Humanizer {
    pub settings: HumanizerSettings,
}

impl Humanizer {
    pub fn new(settings: HumanizerSettings) -> Self {
        Self { settings }
    }

    fn humanize_channel(&self, samples: &[f32], settings: &HumanizerSettings, sample_rate: u32, rng: &mut Pcg32) -> Vec<f32> {
        let mut out = samples.to_vec();
        if settings.pitch_wobble > 0.0 {
            out = pitch_wobble(&out, settings.pitch_wobble, sample_rate);
        }
        if settings.timing_drift > 0.0 {
            out = timing_drift(&out, settings.timing_drift, sample_rate, rng);
        }
        if settings.velocity_variation > 0.0 {
            velocity_variation(&mut out, settings.velocity_variation, sample_rate, rng);
        }
        if settings.groove_amount > 0.0 {
            groove(&mut out, settings.groove_amount, settings.bpm, sample_rate);
        }
        if settings.analog_warmth > 0.0 {
            out = analog_warmth(&out, settings.analog_warmth, sample_rate, rng);
        }
        out
    }
}

impl PostProcessor for Humanizer {
    fn name(&self) -> &str {
        "humanizer"
    }

    fn process(&self, buffer: &AudioBuffer, rng: &mut Pcg32) -> AudioBuffer {
        let base_seed: u64 = rng.gen();
        let right = self.settings.right_channel();
        let samples = buffer
            .samples
            .par_iter()
            .enumerate()
            .map(|(ch, plane)| {
                let mut channel_rng = create_derived_rng(base_seed, ch as u64);
                let settings = if ch == 0 { &self.settings } else { &right };
                self.humanize_channel(plane, settings, buffer.sample_rate, &mut channel_rng)
            })
            .collect();

        AudioBuffer {
            samples,
            sample_rate: buffer.sample_rate,
            channels: buffer.channels,
        }
    }
}

/// Catmull-Rom interpolation at fractional index `pos`; zero outside
fn cubic_at(samples: &[f32], pos: f64) -> f32 {
    let n = samples.len() as isize;
    let i = pos.floor() as isize;
    let t = (pos - pos.floor()) as f32;
    let at = |k: isize| -> f32 {
        if (0..n).contains(&k) {
            samples[k as usize]
        } else {
            0.0
        }
    };
    let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t * t
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t * t * t)
}

/// Tape-style wow and flutter via variable-rate resampling. Length is
/// preserved.
pub fn pitch_wobble(samples: &[f32], amount: f64, sample_rate: u32) -> Vec<f32> {
    let n = samples.len();
    if n < 2 {
        return samples.to_vec();
    }
    let sr = sample_rate as f64;

    let mut positions = Vec::with_capacity(n);
    let mut acc = 0.0;
    for i in 0..n {
        let t = i as f64 / sr;
        let semitones = (2.0 * PI * 0.8 * t).sin() * amount * 0.003
            + (2.0 * PI * 3.2 * t).sin() * amount * 0.001
            + (2.0 * PI * 0.3 * t).sin() * amount * 0.002;
        positions.push(acc);
        acc += 2f64.powf(semitones / 12.0);
    }
    let acc = positions[n - 1];
    let scale = (n - 1) as f64 / acc;
    positions.iter().map(|&p| cubic_at(samples, p * scale)).collect()
}

/// Indices of local maxima above `height`, at least `distance` apart,
/// keeping the tallest when two compete
fn find_peaks(envelope: &[f32], height: f32, distance: usize) -> Vec<usize> {
    let mut candidates: Vec<usize> = (1..envelope.len().saturating_sub(1))
        .filter(|&i| envelope[i] > height && envelope[i] >= envelope[i - 1] && envelope[i] > envelope[i + 1])
        .collect();
    candidates.sort_by(|&a, &b| envelope[b].total_cmp(&envelope[a]));

    let mut kept: Vec<usize> = Vec::new();
    for c in candidates {
        if kept.iter().all(|&k| k.abs_diff(c) >= distance) {
            kept.push(c);
        }
    }
    kept.sort_unstable();
    kept
}

const TIMING_MAX_SHIFT_MS: f64 = 15.0;
const SEGMENT_FADE: usize = 100;

/// Shift each transient's segment by a small random offset, crossfading
/// segment edges, then restore the original peak level
pub fn timing_drift(samples: &[f32], amount: f64, sample_rate: u32, rng: &mut Pcg32) -> Vec<f32> {
    let envelope = envelope_follower(samples, 5.0, 50.0, sample_rate);
    let peaks = find_peaks(&envelope, 0.1, (sample_rate / 20) as usize);
    if peaks.is_empty() {
        return samples.to_vec();
    }

    let n = samples.len();
    let mut output = vec![0.0_f32; n];
    for (idx, &peak) in peaks.iter().enumerate() {
        let shift_ms = (rng.gen::<f64>() * 2.0 - 1.0) * amount * TIMING_MAX_SHIFT_MS;
        let shift = (shift_ms * sample_rate as f64 / 1000.0) as isize;

        let start = if idx == 0 { 0 } else { (peaks[idx - 1] + peak) / 2 };
        let end = if idx == peaks.len() - 1 { n } else { (peak + peaks[idx + 1]) / 2 };
        let mut segment = samples[start..end].to_vec();
        let seg_len = segment.len();

        let fade = SEGMENT_FADE.min(seg_len / 10);
        for k in 0..fade {
            let g = k as f32 / fade as f32;
            segment[k] *= g;
            segment[seg_len - 1 - k] *= g;
        }

        let new_start = (start as isize + shift).clamp(0, (n - seg_len) as isize) as usize;
        for (o, s) in output[new_start..new_start + seg_len].iter_mut().zip(&segment) {
            *o += s;
        }
    }

    let out_peak = peak_abs(&output);
    if out_peak > 0.0 {
        let scale = (peak_abs(samples) / out_peak) as f32;
        output.iter_mut().for_each(|s| *s *= scale);
    }
    output
}

/// Smooth random gain curve, four control points per second, kept within
/// 0.7..1.3
pub fn velocity_variation(samples: &mut [f32], amount: f64, sample_rate: u32, rng: &mut Pcg32) {
    let n = samples.len();
    if n < 2 {
        return;
    }
    let points = ((n as f64 / sample_rate as f64 * 4.0) as usize).max(2);
    let velocities: Vec<f64> = (0..points)
        .map(|_| (1.0 + (rng.gen::<f64>() * 2.0 - 1.0) * amount * 0.3).clamp(0.7, 1.3))
        .collect();

    let spacing = (n - 1) as f64 / (points - 1) as f64;
    for (i, s) in samples.iter_mut().enumerate() {
        let x = i as f64 / spacing;
        let k = (x.floor() as usize).min(points - 2);
        let t = x - k as f64;
        // Cosine interpolation between control points
        let w = (1.0 - (PI * t).cos()) / 2.0;
        let gain = velocities[k] * (1.0 - w) + velocities[k + 1] * w;
        *s = (*s as f64 * gain) as f32;
    }
}

/// Emphasize beats 1 and 3, soften 2 and 4
pub fn groove(samples: &mut [f32], amount: f64, bpm: f64, sample_rate: u32) {
    if bpm <= 0.0 {
        return;
    }
    let beat_seconds = 60.0 / bpm;
    let sr = sample_rate as f64;
    let beats = (samples.len() as f64 / sr / beat_seconds) as usize;

    for beat in 0..beats {
        let start = (beat as f64 * beat_seconds * sr) as usize;
        let end = (((beat + 1) as f64 * beat_seconds * sr) as usize).min(samples.len());
        let emphasis = match beat % 4 {
            0 => 1.0 + amount * 0.08,
            2 => 1.0 + amount * 0.05,
            _ => 1.0 - amount * 0.03,
        } as f32;
        samples[start..end].iter_mut().for_each(|s| *s *= emphasis);
    }
}

/// Gentle saturation, high-passed hiss, low rumble and HF rolloff, blended
/// with the dry signal
pub fn analog_warmth(samples: &[f32], amount: f64, sample_rate: u32, rng: &mut Pcg32) -> Vec<f32> {
    let n = samples.len();
    let drive = (amount * 0.2) as f32;
    let mut saturated: Vec<f32> = samples
        .iter()
        .map(|&x| (x * (1.0 + drive)).tanh() / (1.0 + drive * 0.5))
        .collect();
    Biquad::first_order_lowpass(sample_rate, 16_000.0).process(&mut saturated);

    let mut hiss = white(rng, n, amount * 0.002 * 3f64.sqrt());
    apply_cascade(&butterworth_highpass(4, 4000.0, sample_rate), &mut hiss);

    let rumble_freq = 30.0 + (rng.gen::<f64>() * 2.0 - 1.0) * 5.0;
    let rumble_amp = amount * 0.001;
    let sr = sample_rate as f64;

    let blend = (0.6 + amount * 0.4) as f32;
    (0..n)
        .map(|i| {
            let rumble = (rumble_amp * (2.0 * PI * rumble_freq * i as f64 / sr).sin()) as f32;
            let wet = saturated[i] + hiss[i] + rumble;
            wet * blend + samples[i] * (1.0 - blend)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    fn tone(sr: u32, secs: f64) -> Vec<f32> {
        (0..(sr as f64 * secs) as usize)
            .map(|i| 0.4 * (2.0 * PI * 220.0 * i as f64 / sr as f64).sin() as f32)
            .collect()
    }

    #[test]
    fn humanizer_preserves_layout_and_is_seeded() {
        let sr = 8000;
        let buffer = AudioBuffer::from_stereo(tone(sr, 2.0), tone(sr, 2.0), sr);
        let humanizer = Humanizer::default();

        let a = humanizer.process(&buffer, &mut create_rng(1));
        let b = humanizer.process(&buffer, &mut create_rng(1));
        let c = humanizer.process(&buffer, &mut create_rng(2));

        assert_eq!(a.channels, 2);
        assert_eq!(a.frame_count(), buffer.frame_count());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.samples.iter().flatten().all(|s| s.is_finite()));
    }

    #[test]
    fn zero_wobble_is_identity_like() {
        let sr = 8000;
        let input = tone(sr, 0.5);
        let out = pitch_wobble(&input, 0.0, sr);
        for (a, b) in input.iter().zip(&out) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn velocity_curve_stays_in_range() {
        let mut samples = vec![1.0_f32; 16_000];
        velocity_variation(&mut samples, 1.0, 8000, &mut create_rng(5));
        assert!(samples.iter().all(|&g| (0.7..=1.3).contains(&g)));
    }

    #[test]
    fn groove_emphasizes_downbeat() {
        let sr = 1000;
        let mut samples = vec![1.0_f32; 2000];
        groove(&mut samples, 1.0, 120.0, sr);
        assert!((samples[0] - 1.08).abs() < 1e-6);
        assert!((samples[600] - 0.97).abs() < 1e-6);
        assert!((samples[1200] - 1.05).abs() < 1e-6);
    }

    #[test]
    fn peaks_respect_distance() {
        let mut env = vec![0.0_f32; 100];
        env[10] = 0.5;
        env[12] = 0.8;
        env[50] = 0.3;
        assert_eq!(find_peaks(&env, 0.1, 5), vec![12, 50]);
    }
}
