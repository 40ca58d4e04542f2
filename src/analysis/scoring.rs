//! Weighted-penalty scoring and issue/warning generation

use super::profile::ThresholdProfile;
use super::report::QualityReport;

/// Silence-gap count above which a warning is raised
const MANY_GAPS: usize = 5;
/// Near-clipping share (percent) above which a warning is raised
const NEAR_CLIPPING_WARN_PERCENTAGE: f64 = 1.0;

/// Start at 100, subtract one capped penalty per violated limit, clamp to
/// [0, 100]. Each penalty is monotonic in its own metric.
pub fn score(report: &QualityReport, profile: &ThresholdProfile) -> f64 {
    let p = &profile.penalties;
    let mut score = 100.0;

    score -= p
        .clipping
        .apply(report.clipping_percentage - profile.clipping_max_percentage);
    score -= p
        .silence_percentage
        .apply(report.total_silence_percentage - profile.silence_max_percentage);
    score -= p
        .silence_gap
        .apply(report.longest_silence_duration - profile.silence_max_gap_seconds);
    score -= p
        .dynamic_range
        .apply(profile.dynamic_range_min_db - report.dynamic_range_db);
    score -= p.peak.apply(report.peak_level_db - profile.peak_max_db);
    score -= p.rms_low.apply(profile.rms_min_db - report.rms_level_db);
    score -= p.rms_high.apply(report.rms_level_db - profile.rms_max_db);
    score -= p
        .spectral_flatness
        .apply(profile.spectral_flatness_min - report.spectral_flatness);

    if let Some(stereo) = &report.stereo {
        score -= p
            .phase_correlation
            .apply(profile.phase_correlation_min - stereo.phase_correlation);
        score -= p
            .stereo_width
            .apply(profile.stereo_width_min - stereo.width_percent);
    }

    for deviation in balance_deviations_db(report) {
        score -= p
            .frequency_balance
            .apply(deviation - profile.frequency_balance_tolerance_db);
    }

    score -= p.lufs_low.apply(profile.lufs_min - report.integrated_lufs);
    score -= p.lufs_high.apply(report.integrated_lufs - profile.lufs_max);
    score -= p.true_peak.apply(report.true_peak_db - profile.true_peak_max_db);

    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Deviation of each non-empty band from the mean band energy, in dB
/// (`20·log10` of the energy ratio)
fn balance_deviations_db(report: &QualityReport) -> Vec<f64> {
    let bands = report.frequency_balance.as_array();
    let avg = bands.iter().sum::<f64>() / bands.len() as f64;
    if avg <= 0.0 {
        return Vec::new();
    }
    bands
        .iter()
        .filter(|&&energy| energy > 0.0)
        .map(|&energy| (20.0 * (energy / avg).log10()).abs())
        .collect()
}

/// Human-readable critical issues and warnings
pub fn findings(report: &QualityReport, profile: &ThresholdProfile) -> (Vec<String>, Vec<String>) {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    if report.clipping_percentage > profile.clipping_max_percentage {
        issues.push(format!(
            "CLIPPING DETECTED: {:.3}% of samples are clipped",
            report.clipping_percentage
        ));
    }
    if report.longest_silence_duration > profile.silence_max_gap_seconds {
        issues.push(format!(
            "LONG SILENCE GAP: {:.1}s of silence detected",
            report.longest_silence_duration
        ));
    }
    if report.total_silence_percentage > profile.silence_max_percentage {
        issues.push(format!(
            "TOO MUCH SILENCE: {:.1}% of audio is silent",
            report.total_silence_percentage
        ));
    }
    if report.peak_level_db > profile.peak_max_db {
        issues.push(format!(
            "PEAK TOO HOT: {:.1}dB (max {}dB)",
            report.peak_level_db, profile.peak_max_db
        ));
    }
    if report.true_peak_db > profile.true_peak_max_db {
        issues.push(format!(
            "TRUE PEAK TOO HOT: {:.1}dBTP (max {}dBTP)",
            report.true_peak_db, profile.true_peak_max_db
        ));
    }
    if report.integrated_lufs < profile.lufs_min || report.integrated_lufs > profile.lufs_max {
        issues.push(format!(
            "LOUDNESS OUT OF RANGE: {:.1} LUFS (expected {} to {} LUFS)",
            report.integrated_lufs, profile.lufs_min, profile.lufs_max
        ));
    }

    if report.dynamic_range_db < profile.dynamic_range_min_db {
        warnings.push(format!("Low dynamic range: {:.1}dB", report.dynamic_range_db));
    }
    if report.spectral_flatness < profile.spectral_flatness_min {
        warnings.push(format!(
            "Sound too synthetic (spectral flatness: {:.3})",
            report.spectral_flatness
        ));
    }
    if let Some(stereo) = &report.stereo {
        if stereo.phase_correlation < profile.phase_correlation_min {
            warnings.push(format!(
                "Phase correlation issues: {:.2}",
                stereo.phase_correlation
            ));
        }
        if stereo.width_percent < profile.stereo_width_min {
            warnings.push(format!("Narrow stereo image: {:.1}% width", stereo.width_percent));
        }
    }
    if report.silence_gap_count > MANY_GAPS {
        warnings.push(format!(
            "Multiple silence gaps detected: {} gaps",
            report.silence_gap_count
        ));
    }
    if report.near_clipping_percentage > NEAR_CLIPPING_WARN_PERCENTAGE {
        warnings.push(format!(
            "Near-clipping: {:.2}% of samples above -0.4 dBFS",
            report.near_clipping_percentage
        ));
    }

    (issues, warnings)
}
