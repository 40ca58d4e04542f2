use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use proptest::prelude::*;

use dj_master::analysis::scoring::score;
use dj_master::analysis::{analyze, QualityReport, StereoMetrics, ThresholdProfile, SILENCE_DB};
use dj_master::AudioBuffer;

fn sine(freq: f64, amp: f32, secs: f64, sr: u32) -> Vec<f32> {
    (0..(secs * sr as f64) as usize)
        .map(|i| amp * (2.0 * PI * freq * i as f64 / sr as f64).sin() as f32)
        .collect()
}

fn report_with(
    clipping: f64,
    silence: f64,
    peak_db: f64,
    rms_db: f64,
    lufs: f64,
    correlation: f64,
) -> QualityReport {
    let mut report = QualityReport::silent("prop", 48_000, 2);
    report.issues.clear();
    report.clipping_percentage = clipping;
    report.total_silence_percentage = silence;
    report.peak_level_db = peak_db;
    report.rms_level_db = rms_db;
    report.dynamic_range_db = peak_db - rms_db;
    report.integrated_lufs = lufs;
    report.true_peak_db = peak_db;
    report.stereo = Some(StereoMetrics {
        width_percent: 30.0,
        phase_correlation: correlation,
    });
    report
}

proptest! {
    #[test]
    fn score_is_bounded(
        clipping in 0.0..100.0f64,
        silence in 0.0..100.0f64,
        peak in -120.0..6.0f64,
        rms in -120.0..0.0f64,
        lufs in -70.0..0.0f64,
        corr in -1.0..1.0f64,
    ) {
        let report = report_with(clipping, silence, peak, rms, lufs, corr);
        for profile in [ThresholdProfile::strict(), ThresholdProfile::relaxed()] {
            let s = score(&report, &profile);
            prop_assert!((0.0..=100.0).contains(&s));
        }
    }

    #[test]
    fn more_clipping_never_scores_higher(
        base in 0.0..50.0f64,
        extra in 0.0..50.0f64,
        silence in 0.0..100.0f64,
    ) {
        let profile = ThresholdProfile::strict();
        let a = report_with(base, silence, -3.0, -14.0, -12.0, 0.9);
        let b = report_with(base + extra, silence, -3.0, -14.0, -12.0, 0.9);
        prop_assert!(score(&b, &profile) <= score(&a, &profile));
    }

    #[test]
    fn more_silence_never_scores_higher(
        base in 0.0..50.0f64,
        extra in 0.0..50.0f64,
    ) {
        let profile = ThresholdProfile::relaxed();
        let a = report_with(0.0, base, -3.0, -14.0, -12.0, 0.9);
        let b = report_with(0.0, base + extra, -3.0, -14.0, -12.0, 0.9);
        prop_assert!(score(&b, &profile) <= score(&a, &profile));
    }
}

#[test]
fn analysis_is_deterministic() {
    let sr = 48_000;
    let buffer = AudioBuffer::from_stereo(sine(220.0, 0.4, 2.0, sr), sine(330.0, 0.3, 2.0, sr), sr);
    let profile = ThresholdProfile::strict();
    let a = analyze(&buffer, &profile).unwrap();
    let b = analyze(&buffer, &profile).unwrap();
    assert_eq!(a, b);
}

#[test]
fn identical_channels_are_fully_correlated_and_narrow() {
    let sr = 48_000;
    let tone = sine(440.0, 0.5, 1.0, sr);
    let report = analyze(&AudioBuffer::from_stereo(tone.clone(), tone, sr), &ThresholdProfile::strict()).unwrap();
    let stereo = report.stereo.unwrap();
    assert_abs_diff_eq!(stereo.phase_correlation, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(stereo.width_percent, 0.0, epsilon = 1e-9);
    assert!(report.warnings.iter().any(|w| w.to_lowercase().contains("stereo")));
}

#[test]
fn sine_levels_match_theory() {
    let sr = 48_000;
    let report = analyze(&AudioBuffer::from_mono(sine(1000.0, 0.5, 1.0, sr), sr), &ThresholdProfile::strict()).unwrap();
    // RMS of a sine is amplitude / sqrt(2)
    assert_abs_diff_eq!(report.rms_level_db, 20.0 * (0.5 / 2f64.sqrt()).log10(), epsilon = 0.05);
    assert_abs_diff_eq!(report.peak_level_db, 20.0 * 0.5f64.log10(), epsilon = 0.05);
    assert_abs_diff_eq!(report.crest_factor_db, 3.01, epsilon = 0.05);
    assert!(report.stereo.is_none());
    assert!(report.spectral_centroid > 900.0 && report.spectral_centroid < 1100.0);
}

#[test]
fn half_clipped_signal() {
    let sr = 48_000;
    let samples: Vec<f32> = (0..sr as usize).map(|i| if i % 2 == 0 { 1.0 } else { 0.3 }).collect();
    let report = analyze(&AudioBuffer::from_mono(samples, sr), &ThresholdProfile::strict()).unwrap();
    assert_abs_diff_eq!(report.clipping_percentage, 50.0, epsilon = 1e-9);
    assert!(!report.passed);
    assert!(report.issues.iter().any(|i| i.contains("CLIPPING")));
}

#[test]
fn long_silence_at_high_rate_fails_without_panicking() {
    let sr = 96_000;
    let buffer = AudioBuffer::silent(2, sr, 10 * sr as usize);
    let report = analyze(&buffer, &ThresholdProfile::strict()).unwrap();

    assert_abs_diff_eq!(report.total_silence_percentage, 100.0, epsilon = 1e-9);
    assert_eq!(report.silence_gap_count, 1);
    assert_abs_diff_eq!(report.longest_silence_duration, 10.0, epsilon = 1e-6);
    assert_eq!(report.integrated_lufs, -70.0);
    assert_eq!(report.stereo.unwrap().phase_correlation, 1.0);
    assert_abs_diff_eq!(report.peak_level_db, SILENCE_DB, epsilon = 1e-9);
    assert_abs_diff_eq!(report.rms_level_db, SILENCE_DB, epsilon = 1e-9);
    assert_eq!(report.overall_score, 0.0);
    assert!(!report.passed);
}

#[test]
fn empty_buffer_yields_silent_report() {
    let report = analyze(&AudioBuffer::new(2, 48_000), &ThresholdProfile::strict()).unwrap();
    assert_eq!(report.overall_score, 0.0);
    assert!(!report.passed);
}

#[test]
fn malformed_layout_is_an_error() {
    let ragged = AudioBuffer::from_stereo(vec![0.1; 10], vec![0.1; 9], 48_000);
    assert!(analyze(&ragged, &ThresholdProfile::strict()).is_err());
}
