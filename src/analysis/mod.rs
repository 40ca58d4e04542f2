//! Audio quality analysis: metric extraction, scoring and verdict

pub mod metrics;
pub mod profile;
pub mod report;
pub mod scoring;

use tracing::{debug, warn};

use crate::dsp::loudness::{measure_loudness, true_peak_db, SILENCE_LUFS};
use crate::error::Result;
use crate::types::AudioBuffer;

pub use profile::{Penalty, PenaltyTable, ThresholdProfile};
pub use report::{FrequencyBalance, QualityReport, SilenceGap, StereoMetrics, SILENCE_DB};

/// Measure `buffer` against `profile`.
///
/// Deterministic for a given (buffer, profile). A zero-length buffer yields
/// the silent report; only malformed layouts are errors.
pub fn analyze(buffer: &AudioBuffer, profile: &ThresholdProfile) -> Result<QualityReport> {
    buffer.validate()?;
    if buffer.is_empty() {
        return Ok(QualityReport::silent(&profile.name, buffer.sample_rate, buffer.channels));
    }

    let levels = metrics::levels(buffer);
    let clipping = metrics::clipping(buffer);
    let silence = metrics::silence(buffer, profile.min_silence_gap_seconds);

    let mono = buffer.mono_mix();
    let (spectral, balance) = rayon::join(
        || metrics::spectral(&mono, buffer.sample_rate),
        || metrics::frequency_balance(&mono, buffer.sample_rate),
    );
    let spectral = spectral?;
    let frequency_balance = balance?;

    let stereo = (buffer.channels == 2).then(|| metrics::stereo(&buffer.samples[0], &buffer.samples[1]));

    let (integrated_lufs, loudness_range_lu) = match measure_loudness(buffer) {
        Ok(m) => (m.integrated_lufs, m.loudness_range),
        Err(e) => {
            warn!("Loudness measurement failed: {}", e);
            (SILENCE_LUFS, 0.0)
        }
    };
    let true_peak_db = true_peak_db(buffer);

    let mut report = QualityReport {
        profile: profile.name.clone(),
        sample_rate: buffer.sample_rate,
        channels: buffer.channels,
        duration_seconds: buffer.duration_secs(),
        peak_level_db: levels.peak_db,
        rms_level_db: levels.rms_db,
        dynamic_range_db: levels.dynamic_range_db,
        crest_factor_db: levels.crest_factor_db,
        clipping_percentage: clipping.clipping_percentage,
        near_clipping_percentage: clipping.near_clipping_percentage,
        saturation_count: clipping.clipped_samples,
        silence_gap_count: silence.gaps.len(),
        longest_silence_duration: silence.longest_seconds,
        total_silence_percentage: silence.total_percentage,
        silence_gaps: silence.gaps,
        spectral_centroid: spectral.centroid,
        spectral_rolloff: spectral.rolloff,
        spectral_flatness: spectral.flatness,
        spectral_flux: spectral.flux,
        frequency_balance,
        stereo,
        integrated_lufs,
        true_peak_db,
        loudness_range_lu,
        overall_score: 0.0,
        passed: false,
        issues: Vec::new(),
        warnings: Vec::new(),
    };

    report.overall_score = scoring::score(&report, profile);
    report.passed = report.overall_score >= profile.passing_score;
    let (issues, warnings) = scoring::findings(&report, profile);
    report.issues = issues;
    report.warnings = warnings;

    debug!(
        "Analysis: score={:.1} passed={} peak={:.2}dB rms={:.2}dB lufs={:.2}",
        report.overall_score, report.passed, report.peak_level_db, report.rms_level_db, report.integrated_lufs
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_buffer_yields_silent_report() {
        let report = analyze(&AudioBuffer::new(2, 48_000), &ThresholdProfile::strict()).unwrap();
        assert_eq!(report.overall_score, 0.0);
        assert!(!report.passed);
        assert_eq!(report.frequency_balance.total(), 0.0);
    }

    #[test]
    fn malformed_layout_is_an_error() {
        let buffer = AudioBuffer::from_stereo(vec![0.0; 10], vec![0.0; 9], 48_000);
        assert!(matches!(
            analyze(&buffer, &ThresholdProfile::strict()),
            Err(Error::RaggedChannels)
        ));
    }

    #[test]
    fn mono_report_has_no_stereo_section() {
        let samples: Vec<f32> = (0..48_000).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let report = analyze(&AudioBuffer::from_mono(samples, 48_000), &ThresholdProfile::relaxed()).unwrap();
        assert!(report.stereo.is_none());
        assert!(report.to_string().contains("OVERALL SCORE"));
    }
}
