//! Quality report: one immutable snapshot of measurements for one buffer

use std::fmt;

use serde::Serialize;

use crate::dsp::loudness::SILENCE_LUFS;

/// Sentinel for the level of a silent buffer, `20 * log10(1e-10)`
pub const SILENCE_DB: f64 = -200.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SilenceGap {
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// Energy share per band, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrequencyBalance {
    pub sub_bass: f64,
    pub bass: f64,
    pub low_mid: f64,
    pub mid: f64,
    pub high_mid: f64,
    pub high: f64,
}

impl FrequencyBalance {
    pub fn as_array(&self) -> [f64; 6] {
        [self.sub_bass, self.bass, self.low_mid, self.mid, self.high_mid, self.high]
    }

    pub fn from_array(v: [f64; 6]) -> Self {
        Self {
            sub_bass: v[0],
            bass: v[1],
            low_mid: v[2],
            mid: v[3],
            high_mid: v[4],
            high: v[5],
        }
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StereoMetrics {
    /// Side energy share, 0-100
    pub width_percent: f64,
    /// Normalized L/R cross-correlation, -1..1
    pub phase_correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub profile: String,
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_seconds: f64,

    // Levels
    pub peak_level_db: f64,
    pub rms_level_db: f64,
    pub dynamic_range_db: f64,
    pub crest_factor_db: f64,

    // Clipping
    pub clipping_percentage: f64,
    pub near_clipping_percentage: f64,
    pub saturation_count: usize,

    // Silence
    pub silence_gaps: Vec<SilenceGap>,
    pub total_silence_percentage: f64,
    pub longest_silence_duration: f64,
    pub silence_gap_count: usize,

    // Spectral
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub spectral_flatness: f64,
    pub spectral_flux: f64,

    pub frequency_balance: FrequencyBalance,
    /// Present for two-channel input only
    pub stereo: Option<StereoMetrics>,

    // Loudness
    pub integrated_lufs: f64,
    pub true_peak_db: f64,
    pub loudness_range_lu: f64,

    pub overall_score: f64,
    pub passed: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl QualityReport {
    /// Report for a zero-length buffer: everything at the silence sentinels,
    /// score 0
    pub fn silent(profile: &str, sample_rate: u32, channels: usize) -> Self {
        Self {
            profile: profile.to_string(),
            sample_rate,
            channels,
            duration_seconds: 0.0,
            peak_level_db: SILENCE_DB,
            rms_level_db: SILENCE_DB,
            dynamic_range_db: 0.0,
            crest_factor_db: 0.0,
            clipping_percentage: 0.0,
            near_clipping_percentage: 0.0,
            saturation_count: 0,
            silence_gaps: Vec::new(),
            total_silence_percentage: 100.0,
            longest_silence_duration: 0.0,
            silence_gap_count: 0,
            spectral_centroid: 0.0,
            spectral_rolloff: 0.0,
            spectral_flatness: 0.0,
            spectral_flux: 0.0,
            frequency_balance: FrequencyBalance::default(),
            stereo: None,
            integrated_lufs: SILENCE_LUFS,
            true_peak_db: SILENCE_DB,
            loudness_range_lu: 0.0,
            overall_score: 0.0,
            passed: false,
            issues: vec!["EMPTY AUDIO: buffer has no samples".to_string()],
            warnings: Vec::new(),
        }
    }

    pub fn phase_correlation(&self) -> Option<f64> {
        self.stereo.map(|s| s.phase_correlation)
    }

    pub fn stereo_width(&self) -> Option<f64> {
        self.stereo.map(|s| s.width_percent)
    }
}

const RULE: &str = "======================================================================";

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "AUDIO QUALITY ANALYSIS REPORT ({} profile)", self.profile)?;
        writeln!(f, "{RULE}")?;

        writeln!(f, "\nLEVELS:")?;
        writeln!(f, "  Peak:          {:>8.2} dB", self.peak_level_db)?;
        writeln!(f, "  RMS:           {:>8.2} dB", self.rms_level_db)?;
        writeln!(f, "  Dynamic Range: {:>8.2} dB", self.dynamic_range_db)?;
        writeln!(f, "  Crest Factor:  {:>8.2} dB", self.crest_factor_db)?;

        writeln!(f, "\nCLIPPING & SATURATION:")?;
        writeln!(f, "  Clipping:      {:>8.3} %", self.clipping_percentage)?;
        writeln!(f, "  Near-Clipping: {:>8.3} %", self.near_clipping_percentage)?;

        writeln!(f, "\nSILENCE:")?;
        writeln!(f, "  Total Silence: {:>8.2} %", self.total_silence_percentage)?;
        writeln!(f, "  Silence Gaps:  {:>8} gaps", self.silence_gap_count)?;
        writeln!(f, "  Longest Gap:   {:>8.2} s", self.longest_silence_duration)?;

        writeln!(f, "\nSPECTRUM:")?;
        writeln!(f, "  Centroid:      {:>8.1} Hz", self.spectral_centroid)?;
        writeln!(f, "  Rolloff:       {:>8.1} Hz", self.spectral_rolloff)?;
        writeln!(f, "  Flatness:      {:>8.3}", self.spectral_flatness)?;
        writeln!(f, "  Flux:          {:>8.3}", self.spectral_flux)?;

        let balance = &self.frequency_balance;
        writeln!(f, "\nFREQUENCY BALANCE:")?;
        writeln!(f, "  Sub-Bass:      {:>8.2} %", balance.sub_bass)?;
        writeln!(f, "  Bass:          {:>8.2} %", balance.bass)?;
        writeln!(f, "  Low-Mid:       {:>8.2} %", balance.low_mid)?;
        writeln!(f, "  Mid:           {:>8.2} %", balance.mid)?;
        writeln!(f, "  High-Mid:      {:>8.2} %", balance.high_mid)?;
        writeln!(f, "  High:          {:>8.2} %", balance.high)?;

        if let Some(stereo) = &self.stereo {
            writeln!(f, "\nSTEREO FIELD:")?;
            writeln!(f, "  Width:         {:>8.2} %", stereo.width_percent)?;
            writeln!(f, "  Phase Corr:    {:>8.2}", stereo.phase_correlation)?;
        }

        writeln!(f, "\nLOUDNESS:")?;
        writeln!(f, "  Integrated:    {:>8.2} LUFS", self.integrated_lufs)?;
        writeln!(f, "  True Peak:     {:>8.2} dBTP", self.true_peak_db)?;
        writeln!(f, "  Range:         {:>8.2} LU", self.loudness_range_lu)?;

        if !self.issues.is_empty() {
            writeln!(f, "\nCRITICAL ISSUES:")?;
            for issue in &self.issues {
                writeln!(f, "  - {issue}")?;
            }
        }
        if !self.warnings.is_empty() {
            writeln!(f, "\nWARNINGS:")?;
            for warning in &self.warnings {
                writeln!(f, "  - {warning}")?;
            }
        }

        let status = if self.passed { "PASSED" } else { "FAILED" };
        writeln!(f, "\n{RULE}")?;
        writeln!(f, "OVERALL SCORE: {:.1}/100 - {}", self.overall_score, status)?;
        write!(f, "{RULE}")
    }
}
