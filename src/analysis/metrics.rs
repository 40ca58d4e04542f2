//! Metric extraction, one function per metric group

use rayon::prelude::*;

use crate::dsp::level::{linear_to_db, peak_abs_planes, rms_planes};
use crate::dsp::spectrum::{bin_frequency, frame_starts, magnitude, Stft};
use crate::dsp::NUMERIC_FLOOR;
use crate::error::Result;
use crate::types::AudioBuffer;

use super::report::{FrequencyBalance, SilenceGap, StereoMetrics};

pub const CLIPPING_THRESHOLD: f32 = 0.99;
pub const NEAR_CLIPPING_THRESHOLD: f32 = 0.95;
pub const SILENCE_THRESHOLD: f32 = 0.001;

const SPECTRAL_WINDOW: usize = 4096;
const SPECTRAL_HOP: usize = SPECTRAL_WINDOW / 2;
const ROLLOFF_FRACTION: f64 = 0.95;

const BALANCE_WINDOW: usize = 8192;
const BALANCE_HOP: usize = BALANCE_WINDOW / 4;

/// Frames transformed per parallel batch; bounds peak memory on long inputs
const FRAMES_PER_BATCH: usize = 256;

/// Band edges in Hz: sub-bass, bass, low-mid, mid, high-mid, high
pub const BALANCE_BANDS: [(f64, f64); 6] = [
    (20.0, 60.0),
    (60.0, 250.0),
    (250.0, 500.0),
    (500.0, 2000.0),
    (2000.0, 6000.0),
    (6000.0, 20000.0),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub peak_db: f64,
    pub rms_db: f64,
    pub dynamic_range_db: f64,
    pub crest_factor_db: f64,
}

pub fn levels(buffer: &AudioBuffer) -> Levels {
    let peak = peak_abs_planes(&buffer.samples);
    let rms = rms_planes(&buffer.samples);
    let peak_db = linear_to_db(peak);
    let rms_db = linear_to_db(rms);

    Levels {
        peak_db,
        rms_db,
        dynamic_range_db: peak_db - rms_db,
        crest_factor_db: 20.0 * ((peak + NUMERIC_FLOOR) / (rms + NUMERIC_FLOOR)).log10(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clipping {
    pub clipped_samples: usize,
    pub clipping_percentage: f64,
    pub near_clipping_percentage: f64,
}

pub fn clipping(buffer: &AudioBuffer) -> Clipping {
    let total: usize = buffer.samples.iter().map(|ch| ch.len()).sum();
    let (clipped, near) = buffer
        .samples
        .iter()
        .flat_map(|ch| ch.iter())
        .fold((0usize, 0usize), |(clipped, near), &s| {
            let a = s.abs();
            (
                clipped + usize::from(a >= CLIPPING_THRESHOLD),
                near + usize::from(a >= NEAR_CLIPPING_THRESHOLD),
            )
        });

    let pct = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 * 100.0 };
    Clipping {
        clipped_samples: clipped,
        clipping_percentage: pct(clipped),
        near_clipping_percentage: pct(near),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Silence {
    pub gaps: Vec<SilenceGap>,
    pub total_percentage: f64,
    pub longest_seconds: f64,
}

/// Run-length encode silent frames (every channel below the threshold).
/// Runs shorter than `min_gap_seconds` count toward the total but are not
/// reported as gaps.
pub fn silence(buffer: &AudioBuffer, min_gap_seconds: f64) -> Silence {
    let frames = buffer.frame_count();
    let sr = buffer.sample_rate as f64;
    let is_silent = |i: usize| buffer.samples.iter().all(|ch| ch[i].abs() < SILENCE_THRESHOLD);

    let mut gaps = Vec::new();
    let mut silent_frames = 0usize;
    let mut run_start: Option<usize> = None;

    let close_run = |start: usize, end: usize, gaps: &mut Vec<SilenceGap>| {
        let duration = (end - start) as f64 / sr;
        if duration >= min_gap_seconds {
            gaps.push(SilenceGap {
                start_seconds: start as f64 / sr,
                duration_seconds: duration,
            });
        }
    };

    for i in 0..frames {
        if is_silent(i) {
            silent_frames += 1;
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            close_run(start, i, &mut gaps);
        }
    }
    if let Some(start) = run_start {
        close_run(start, frames, &mut gaps);
    }

    let longest_seconds = gaps.iter().map(|g| g.duration_seconds).fold(0.0, f64::max);
    Silence {
        gaps,
        total_percentage: if frames == 0 { 100.0 } else { silent_frames as f64 / frames as f64 * 100.0 },
        longest_seconds,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spectral {
    pub centroid: f64,
    pub rolloff: f64,
    pub flatness: f64,
    pub flux: f64,
}

/// Per-frame centroid, rolloff and flatness (averaged over frames) plus
/// spectral flux between consecutive frames, over the mono mix
pub fn spectral(mono: &[f32], sample_rate: u32) -> Result<Spectral> {
    let starts = frame_starts(mono.len(), SPECTRAL_WINDOW, SPECTRAL_HOP);
    if starts.is_empty() {
        return Ok(Spectral::default());
    }

    let stft = Stft::new(SPECTRAL_WINDOW);
    let freqs: Vec<f64> = (0..=SPECTRAL_WINDOW / 2)
        .map(|bin| bin_frequency(bin, SPECTRAL_WINDOW, sample_rate))
        .collect();

    let mut centroid_sum = 0.0;
    let mut rolloff_sum = 0.0;
    let mut flatness_sum = 0.0;
    let mut flux_sum = 0.0;
    let mut flux_pairs = 0usize;
    let mut previous: Option<Vec<f64>> = None;

    for batch in starts.chunks(FRAMES_PER_BATCH) {
        let magnitudes: Vec<Vec<f64>> = stft
            .frames(mono, batch)?
            .par_iter()
            .map(|spectrum| magnitude(spectrum))
            .collect();

        let features: Vec<(f64, f64, f64)> = magnitudes
            .par_iter()
            .map(|mag| frame_features(mag, &freqs))
            .collect();
        for (centroid, rolloff, flatness) in features {
            centroid_sum += centroid;
            rolloff_sum += rolloff;
            flatness_sum += flatness;
        }

        for mag in magnitudes {
            if let Some(prev) = &previous {
                let mean_sq = mag
                    .iter()
                    .zip(prev)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    / mag.len() as f64;
                flux_sum += mean_sq.sqrt();
                flux_pairs += 1;
            }
            previous = Some(mag);
        }
    }

    let n = starts.len() as f64;
    Ok(Spectral {
        centroid: centroid_sum / n,
        rolloff: rolloff_sum / n,
        flatness: flatness_sum / n,
        flux: if flux_pairs == 0 { 0.0 } else { flux_sum / flux_pairs as f64 },
    })
}

/// (centroid Hz, rolloff Hz, flatness) of one magnitude frame
fn frame_features(mag: &[f64], freqs: &[f64]) -> (f64, f64, f64) {
    let power: Vec<f64> = mag.iter().map(|m| m * m).collect();
    let total: f64 = power.iter().sum();

    let weighted: f64 = power.iter().zip(freqs).map(|(p, f)| p * f).sum();
    let centroid = weighted / (total + NUMERIC_FLOOR);

    let target = ROLLOFF_FRACTION * total;
    let mut cumulative = 0.0;
    let mut rolloff_bin = 0;
    for (i, p) in power.iter().enumerate() {
        cumulative += p;
        if cumulative >= target {
            rolloff_bin = i;
            break;
        }
    }

    let log_mean = power.iter().map(|p| (p + NUMERIC_FLOOR).ln()).sum::<f64>() / power.len() as f64;
    let arithmetic_mean = total / power.len() as f64;
    let flatness = log_mean.exp() / (arithmetic_mean + NUMERIC_FLOOR);

    (centroid, freqs[rolloff_bin], flatness)
}

/// Energy share of the six fixed bands, accumulated over 8192-sample Hann
/// windows with 75% overlap. All zeros when there is no in-band energy.
pub fn frequency_balance(mono: &[f32], sample_rate: u32) -> Result<FrequencyBalance> {
    let starts = frame_starts(mono.len(), BALANCE_WINDOW, BALANCE_HOP);
    let stft = Stft::new(BALANCE_WINDOW);

    let band_of_bin: Vec<Option<usize>> = (0..=BALANCE_WINDOW / 2)
        .map(|bin| {
            let freq = bin_frequency(bin, BALANCE_WINDOW, sample_rate);
            BALANCE_BANDS.iter().position(|&(lo, hi)| freq >= lo && freq < hi)
        })
        .collect();

    let mut energies = [0.0_f64; 6];
    for batch in starts.chunks(FRAMES_PER_BATCH) {
        let batch_energies = stft
            .frames(mono, batch)?
            .par_iter()
            .map(|spectrum| {
                let mut bands = [0.0_f64; 6];
                for (c, band) in spectrum.iter().zip(&band_of_bin) {
                    if let Some(b) = band {
                        bands[*b] += c.norm_sqr() as f64;
                    }
                }
                bands
            })
            .reduce(
                || [0.0_f64; 6],
                |mut acc, bands| {
                    for (a, b) in acc.iter_mut().zip(bands) {
                        *a += b;
                    }
                    acc
                },
            );
        for (e, b) in energies.iter_mut().zip(batch_energies) {
            *e += b;
        }
    }

    let total: f64 = energies.iter().sum();
    if total <= 0.0 {
        return Ok(FrequencyBalance::default());
    }
    Ok(FrequencyBalance::from_array(energies.map(|e| e / total * 100.0)))
}

/// Width from the mid/side energy split, correlation as
/// `sum(L*R) / sqrt(sum(L^2) * sum(R^2))`. Silence correlates perfectly.
pub fn stereo(left: &[f32], right: &[f32]) -> StereoMetrics {
    let (mut ll, mut rr, mut lr, mut mid_e, mut side_e) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&l, &r) in left.iter().zip(right) {
        let (l, r) = (l as f64, r as f64);
        ll += l * l;
        rr += r * r;
        lr += l * r;
        let mid = (l + r) / 2.0;
        let side = (l - r) / 2.0;
        mid_e += mid * mid;
        side_e += side * side;
    }

    let total = mid_e + side_e;
    let width_percent = if total > 0.0 { side_e / total * 100.0 } else { 0.0 };
    let denominator = (ll * rr).sqrt();
    let phase_correlation = if denominator > 0.0 {
        (lr / denominator).clamp(-1.0, 1.0)
    } else if ll == 0.0 && rr == 0.0 {
        1.0
    } else {
        // One side silent: no shared content
        0.0
    };

    StereoMetrics {
        width_percent,
        phase_correlation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(freq: f64, amp: f32, frames: usize, sr: u32) -> Vec<f32> {
        (0..frames)
            .map(|i| amp * (2.0 * std::f64::consts::PI * freq * i as f64 / sr as f64).sin() as f32)
            .collect()
    }

    #[test]
    fn silence_gaps_are_run_length_encoded() {
        let sr = 1000;
        let mut samples = vec![0.5_f32; 1000];
        samples.extend(vec![0.0; 1500]); // 1.5 s gap
        samples.extend(vec![0.5; 500]);
        samples.extend(vec![0.0; 200]); // too short to report
        samples.extend(vec![0.5; 800]);
        let buffer = AudioBuffer::from_mono(samples, sr);

        let s = silence(&buffer, 0.5);
        assert_eq!(s.gaps.len(), 1);
        assert_abs_diff_eq!(s.gaps[0].start_seconds, 1.0);
        assert_abs_diff_eq!(s.gaps[0].duration_seconds, 1.5);
        assert_abs_diff_eq!(s.longest_seconds, 1.5);
        assert_abs_diff_eq!(s.total_percentage, 1700.0 / 4000.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn frame_is_silent_only_when_every_channel_is() {
        let left = vec![0.0_f32; 2000];
        let right = vec![0.2_f32; 2000];
        let buffer = AudioBuffer::from_stereo(left, right, 1000);
        let s = silence(&buffer, 0.5);
        assert!(s.gaps.is_empty());
        assert_eq!(s.total_percentage, 0.0);
    }

    #[test]
    fn clipping_counts_every_sample() {
        let buffer = AudioBuffer::from_stereo(vec![1.0, 0.0, 0.96, 0.0], vec![0.0; 4], 48_000);
        let c = clipping(&buffer);
        assert_eq!(c.clipped_samples, 1);
        assert_abs_diff_eq!(c.clipping_percentage, 12.5);
        assert_abs_diff_eq!(c.near_clipping_percentage, 25.0);
    }

    #[test]
    fn sine_rms_and_crest() {
        let sr = 48_000;
        let buffer = AudioBuffer::from_mono(sine(1000.0, 0.5, sr as usize, sr), sr);
        let l = levels(&buffer);
        assert_abs_diff_eq!(l.rms_db, 20.0 * (0.5 / 2f64.sqrt()).log10(), epsilon = 0.01);
        assert_abs_diff_eq!(l.crest_factor_db, 3.01, epsilon = 0.02);
        assert_abs_diff_eq!(l.dynamic_range_db, l.crest_factor_db, epsilon = 1e-6);
    }

    #[test]
    fn pure_tone_is_tonal_and_centered() {
        let sr = 48_000;
        let mono = sine(1000.0, 0.5, sr as usize * 2, sr);
        let s = spectral(&mono, sr).unwrap();
        assert!(s.flatness < 0.01, "flatness {}", s.flatness);
        assert!((s.centroid - 1000.0).abs() < 50.0, "centroid {}", s.centroid);
        assert!(s.rolloff < 1100.0);
    }

    #[test]
    fn balance_finds_the_right_band() {
        let sr = 48_000;
        let mono = sine(100.0, 0.5, sr as usize * 2, sr);
        let balance = frequency_balance(&mono, sr).unwrap();
        assert!(balance.bass > 95.0, "{balance:?}");
        assert_abs_diff_eq!(balance.total(), 100.0, epsilon = 1e-6);

        let silent = frequency_balance(&vec![0.0; 20_000], sr).unwrap();
        assert_eq!(silent.total(), 0.0);
    }

    #[test]
    fn stereo_extremes() {
        let l = sine(440.0, 0.5, 4800, 48_000);
        let inverted: Vec<f32> = l.iter().map(|s| -s).collect();

        let mono = stereo(&l, &l);
        assert_abs_diff_eq!(mono.phase_correlation, 1.0, epsilon = 1e-9);
        assert_eq!(mono.width_percent, 0.0);

        let opposed = stereo(&l, &inverted);
        assert_abs_diff_eq!(opposed.phase_correlation, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(opposed.width_percent, 100.0, epsilon = 1e-9);

        let silent = stereo(&[0.0; 10], &[0.0; 10]);
        assert_eq!(silent.phase_correlation, 1.0);
    }
}
