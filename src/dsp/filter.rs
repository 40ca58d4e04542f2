//! IIR filtering: RBJ biquads, Butterworth cascades and zero-phase band
//! splitting.
//!
//! Every design function clamps its cutoff to [0.001, 0.999] of Nyquist
//! first, so modulated or out-of-range cutoffs never produce an unstable
//! or NaN filter.

use std::f64::consts::PI;

/// Lowest normalized cutoff (fraction of Nyquist) a design accepts
pub const MIN_NORMALIZED_CUTOFF: f64 = 0.001;
/// Highest normalized cutoff (fraction of Nyquist) a design accepts
pub const MAX_NORMALIZED_CUTOFF: f64 = 0.999;

/// Clamp a cutoff frequency in Hz into the valid design range
pub fn clamp_cutoff(freq: f64, sample_rate: u32) -> f64 {
    let nyquist = sample_rate as f64 / 2.0;
    let normalized = if freq.is_finite() { freq / nyquist } else { MIN_NORMALIZED_CUTOFF };
    normalized.clamp(MIN_NORMALIZED_CUTOFF, MAX_NORMALIZED_CUTOFF) * nyquist
}

/// Second-order section, coefficients normalized so a0 == 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    fn omega(sample_rate: u32, freq: f64) -> (f64, f64) {
        let w0 = 2.0 * PI * clamp_cutoff(freq, sample_rate) / sample_rate as f64;
        (w0.cos(), w0.sin())
    }

    pub fn lowpass(sample_rate: u32, freq: f64, q: f64) -> Self {
        let (cos_w0, sin_w0) = Self::omega(sample_rate, freq);
        let alpha = sin_w0 / (2.0 * q);

        let b0 = (1.0 - cos_w0) / 2.0;
        let b1 = 1.0 - cos_w0;
        let b2 = (1.0 - cos_w0) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    pub fn highpass(sample_rate: u32, freq: f64, q: f64) -> Self {
        let (cos_w0, sin_w0) = Self::omega(sample_rate, freq);
        let alpha = sin_w0 / (2.0 * q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = (1.0 + cos_w0) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// First-order lowpass (bilinear one-pole), stored as a degenerate biquad
    pub fn first_order_lowpass(sample_rate: u32, freq: f64) -> Self {
        let k = (PI * clamp_cutoff(freq, sample_rate) / sample_rate as f64).tan();
        let norm = 1.0 / (1.0 + k);
        Self {
            b0: k * norm,
            b1: k * norm,
            b2: 0.0,
            a1: (k - 1.0) * norm,
            a2: 0.0,
        }
    }

    pub fn first_order_highpass(sample_rate: u32, freq: f64) -> Self {
        let k = (PI * clamp_cutoff(freq, sample_rate) / sample_rate as f64).tan();
        let norm = 1.0 / (1.0 + k);
        Self {
            b0: norm,
            b1: -norm,
            b2: 0.0,
            a1: (k - 1.0) * norm,
            a2: 0.0,
        }
    }

    pub fn high_shelf(sample_rate: u32, freq: f64, gain_db: f64, q: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let (cos_w0, sin_w0) = Self::omega(sample_rate, freq);
        let alpha = sin_w0 / (2.0 * q);
        let sqrt_a = a.sqrt();

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha);
        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    pub fn peaking(sample_rate: u32, freq: f64, gain_db: f64, q: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let (cos_w0, sin_w0) = Self::omega(sample_rate, freq);
        let alpha = sin_w0 / (2.0 * q);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos_w0,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w0,
            1.0 - alpha / a,
        )
    }

    /// Narrow band-reject filter
    pub fn notch(sample_rate: u32, freq: f64, q: f64) -> Self {
        let (cos_w0, sin_w0) = Self::omega(sample_rate, freq);
        let alpha = sin_w0 / (2.0 * q);

        Self::normalized(1.0, -2.0 * cos_w0, 1.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    /// Run the section over `samples` in place (direct form I, f64 state)
    pub fn process(&self, samples: &mut [f32]) {
        let mut x1 = 0.0_f64;
        let mut x2 = 0.0_f64;
        let mut y1 = 0.0_f64;
        let mut y2 = 0.0_f64;

        for sample in samples.iter_mut() {
            let x0 = *sample as f64;
            let y0 = self.b0 * x0 + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;

            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;

            *sample = y0 as f32;
        }
    }
}

/// Q values of the second-order sections of an even-order Butterworth
fn butterworth_qs(order: usize) -> Vec<f64> {
    let pairs = order / 2;
    (0..pairs)
        .map(|k| {
            let theta = (2 * k + 1) as f64 * PI / (2.0 * order as f64);
            1.0 / (2.0 * theta.cos())
        })
        .collect()
}

/// Butterworth lowpass of the given order as cascaded sections
pub fn butterworth_lowpass(order: usize, cutoff: f64, sample_rate: u32) -> Vec<Biquad> {
    let order = order.max(1);
    let mut sections: Vec<Biquad> = butterworth_qs(order)
        .into_iter()
        .map(|q| Biquad::lowpass(sample_rate, cutoff, q))
        .collect();
    if order % 2 == 1 {
        sections.push(Biquad::first_order_lowpass(sample_rate, cutoff));
    }
    sections
}

pub fn butterworth_highpass(order: usize, cutoff: f64, sample_rate: u32) -> Vec<Biquad> {
    let order = order.max(1);
    let mut sections: Vec<Biquad> = butterworth_qs(order)
        .into_iter()
        .map(|q| Biquad::highpass(sample_rate, cutoff, q))
        .collect();
    if order % 2 == 1 {
        sections.push(Biquad::first_order_highpass(sample_rate, cutoff));
    }
    sections
}

/// Band-pass cascade: Butterworth highpass at `low` followed by lowpass at
/// `high`. Edges at or beyond the valid range are left open.
pub fn butterworth_bandpass(order: usize, low: f64, high: f64, sample_rate: u32) -> Vec<Biquad> {
    let nyquist = sample_rate as f64 / 2.0;
    let mut sections = Vec::new();
    if low / nyquist > MIN_NORMALIZED_CUTOFF {
        sections.extend(butterworth_highpass(order, low, sample_rate));
    }
    if high / nyquist < MAX_NORMALIZED_CUTOFF {
        sections.extend(butterworth_lowpass(order, high, sample_rate));
    }
    sections
}

/// Causal filtering through a cascade
pub fn apply_cascade(sections: &[Biquad], samples: &mut [f32]) {
    for section in sections {
        section.process(samples);
    }
}

/// Forward-backward (zero-phase) filtering with odd reflection padding at
/// both ends to suppress edge transients
pub fn filtfilt(sections: &[Biquad], samples: &[f32]) -> Vec<f32> {
    if sections.is_empty() || samples.is_empty() {
        return samples.to_vec();
    }
    let len = samples.len();
    let pad = (3 * (2 * sections.len() + 1)).min(len - 1);

    let mut extended = Vec::with_capacity(len + 2 * pad);
    let first = samples[0];
    let last = samples[len - 1];
    extended.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i]));
    extended.extend_from_slice(samples);
    extended.extend((1..=pad).map(|i| 2.0 * last - samples[len - 1 - i]));

    apply_cascade(sections, &mut extended);
    extended.reverse();
    apply_cascade(sections, &mut extended);
    extended.reverse();

    extended[pad..pad + len].to_vec()
}

/// Zero-phase Butterworth band-pass. Safe to sum bands back together
/// without inter-band phase smearing.
pub fn bandpass(samples: &[f32], low_hz: f64, high_hz: f64, sample_rate: u32, order: usize) -> Vec<f32> {
    let sections = butterworth_bandpass(order, low_hz, high_hz, sample_rate);
    filtfilt(&sections, samples)
}

/// Causal Butterworth highpass, in place
pub fn highpass_in_place(samples: &mut [f32], cutoff: f64, sample_rate: u32, order: usize) {
    apply_cascade(&butterworth_highpass(order, cutoff, sample_rate), samples);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::level::rms;

    fn sine(freq: f64, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin() as f32)
            .collect()
    }

    #[test]
    fn cutoff_is_clamped_to_valid_range() {
        assert_eq!(clamp_cutoff(1.0e6, 48_000), 0.999 * 24_000.0);
        assert_eq!(clamp_cutoff(-50.0, 48_000), 0.001 * 24_000.0);
        assert_eq!(clamp_cutoff(f64::NAN, 48_000), 0.001 * 24_000.0);
        assert_eq!(clamp_cutoff(1000.0, 48_000), 1000.0);
    }

    #[test]
    fn out_of_range_designs_stay_finite() {
        let mut samples = sine(440.0, 48_000, 4800);
        apply_cascade(&butterworth_lowpass(4, 90_000.0, 48_000), &mut samples);
        apply_cascade(&butterworth_highpass(4, -10.0, 48_000), &mut samples);
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn bandpass_passes_in_band_and_rejects_out_of_band() {
        let sr = 48_000;
        let in_band = sine(1000.0, sr, sr as usize);
        let out_band = sine(50.0, sr, sr as usize);

        let passed = bandpass(&in_band, 500.0, 2000.0, sr, 4);
        let rejected = bandpass(&out_band, 500.0, 2000.0, sr, 4);

        let ratio_pass = rms(&passed) / rms(&in_band);
        let ratio_reject = rms(&rejected) / rms(&out_band);
        assert!(ratio_pass > 0.85, "pass ratio {ratio_pass}");
        assert!(ratio_reject < 0.01, "reject ratio {ratio_reject}");
    }

    #[test]
    fn filtfilt_has_no_phase_shift() {
        let sr = 48_000;
        let input = sine(1000.0, sr, 4800);
        let output = filtfilt(&butterworth_lowpass(2, 8000.0, sr), &input);
        // Zero phase: the output peaks line up with the input peaks
        let mid = 2400;
        let window = &output[mid - 24..mid + 24];
        let input_window = &input[mid - 24..mid + 24];
        let argmax = |w: &[f32]| {
            w.iter()
                .enumerate()
                .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
                .0
        };
        assert_eq!(argmax(window), argmax(input_window));
    }

    #[test]
    fn notch_attenuates_its_center() {
        let sr = 48_000;
        let mut tone = sine(1000.0, sr, sr as usize);
        Biquad::notch(sr, 1000.0, 20.0).process(&mut tone);
        // Skip the filter's settling time
        assert!(rms(&tone[sr as usize / 2..]) < 0.05);
    }
}
