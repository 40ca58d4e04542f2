//! Threshold profiles: named limit and penalty bundles for scoring

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Genre;

/// Penalty for one violated limit: `min(cap, excess * multiplier)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub multiplier: f64,
    pub cap: f64,
}

impl Penalty {
    pub const fn new(multiplier: f64, cap: f64) -> Self {
        Self { multiplier, cap }
    }

    /// Score deduction for a given excess over the limit
    pub fn apply(&self, excess: f64) -> f64 {
        if excess.is_nan() || excess <= 0.0 {
            return 0.0;
        }
        (excess * self.multiplier).min(self.cap).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyTable {
    pub clipping: Penalty,
    pub silence_percentage: Penalty,
    pub silence_gap: Penalty,
    pub dynamic_range: Penalty,
    pub peak: Penalty,
    pub rms_low: Penalty,
    pub rms_high: Penalty,
    pub spectral_flatness: Penalty,
    pub phase_correlation: Penalty,
    pub stereo_width: Penalty,
    /// Applied per band
    pub frequency_balance: Penalty,
    pub lufs_low: Penalty,
    pub lufs_high: Penalty,
    pub true_peak: Penalty,
}

/// A named set of limits. Exactly one profile is active per analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    pub name: String,
    pub passing_score: f64,

    pub peak_max_db: f64,
    pub rms_min_db: f64,
    pub rms_max_db: f64,
    pub clipping_max_percentage: f64,
    /// Silent runs shorter than this are not reported as gaps
    pub min_silence_gap_seconds: f64,
    pub silence_max_gap_seconds: f64,
    pub silence_max_percentage: f64,
    pub dynamic_range_min_db: f64,
    pub spectral_flatness_min: f64,
    pub phase_correlation_min: f64,
    pub stereo_width_min: f64,
    pub frequency_balance_tolerance_db: f64,
    pub lufs_min: f64,
    pub lufs_max: f64,
    pub true_peak_max_db: f64,

    pub penalties: PenaltyTable,
}

impl ThresholdProfile {
    /// Broadcast-grade limits
    pub fn strict() -> Self {
        Self {
            name: "strict".to_string(),
            passing_score: 85.0,
            peak_max_db: -0.3,
            rms_min_db: -25.0,
            rms_max_db: -6.0,
            clipping_max_percentage: 0.001,
            min_silence_gap_seconds: 0.5,
            silence_max_gap_seconds: 0.8,
            silence_max_percentage: 5.0,
            dynamic_range_min_db: 12.0,
            spectral_flatness_min: 0.15,
            phase_correlation_min: 0.7,
            stereo_width_min: 40.0,
            frequency_balance_tolerance_db: 3.0,
            lufs_min: -20.0,
            lufs_max: -6.0,
            true_peak_max_db: -0.5,
            penalties: PenaltyTable {
                clipping: Penalty::new(1000.0, 60.0),
                silence_percentage: Penalty::new(5.0, 40.0),
                silence_gap: Penalty::new(20.0, 35.0),
                dynamic_range: Penalty::new(3.0, 30.0),
                peak: Penalty::new(20.0, 30.0),
                rms_low: Penalty::new(1.5, 20.0),
                rms_high: Penalty::new(2.0, 10.0),
                spectral_flatness: Penalty::new(30.0, 15.0),
                phase_correlation: Penalty::new(40.0, 25.0),
                stereo_width: Penalty::new(0.5, 15.0),
                frequency_balance: Penalty::new(2.0, 5.0),
                lufs_low: Penalty::new(2.0, 20.0),
                lufs_high: Penalty::new(3.0, 15.0),
                true_peak: Penalty::new(20.0, 25.0),
            },
        }
    }

    /// Permissive limits for electronic/club material, which is loud, dense
    /// and often deliberately narrow or tonal
    pub fn relaxed() -> Self {
        Self {
            name: "relaxed".to_string(),
            passing_score: 60.0,
            peak_max_db: -0.1,
            rms_min_db: -30.0,
            rms_max_db: -4.0,
            clipping_max_percentage: 0.01,
            min_silence_gap_seconds: 1.0,
            silence_max_gap_seconds: 2.0,
            silence_max_percentage: 15.0,
            dynamic_range_min_db: 6.0,
            spectral_flatness_min: 0.05,
            phase_correlation_min: 0.3,
            stereo_width_min: 15.0,
            frequency_balance_tolerance_db: 6.0,
            lufs_min: -24.0,
            lufs_max: -5.0,
            true_peak_max_db: 0.0,
            penalties: PenaltyTable {
                clipping: Penalty::new(100.0, 50.0),
                silence_percentage: Penalty::new(2.0, 30.0),
                silence_gap: Penalty::new(10.0, 30.0),
                dynamic_range: Penalty::new(2.0, 20.0),
                peak: Penalty::new(10.0, 20.0),
                rms_low: Penalty::new(1.0, 15.0),
                rms_high: Penalty::new(2.0, 10.0),
                spectral_flatness: Penalty::new(20.0, 10.0),
                phase_correlation: Penalty::new(20.0, 15.0),
                stereo_width: Penalty::new(1.0 / 3.0, 10.0),
                frequency_balance: Penalty::new(1.0, 3.0),
                lufs_low: Penalty::new(1.5, 15.0),
                lufs_high: Penalty::new(3.0, 15.0),
                true_peak: Penalty::new(10.0, 15.0),
            },
        }
    }

    /// Profile selection is a pure function of genre
    pub fn for_genre(genre: Genre) -> Self {
        if genre.is_electronic() {
            Self::relaxed()
        } else {
            Self::strict()
        }
    }

    /// Load a profile from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self::strict()
    }
}

impl From<&str> for ThresholdProfile {
    /// "strict" and "relaxed" name the presets; anything else is read as a
    /// genre tag
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "strict" | "broadcast" => Self::strict(),
            "relaxed" | "electronic" => Self::relaxed(),
            genre => Self::for_genre(Genre::from(genre)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_saturates_at_cap() {
        let p = Penalty::new(20.0, 30.0);
        assert_eq!(p.apply(-1.0), 0.0);
        assert_eq!(p.apply(0.5), 10.0);
        assert_eq!(p.apply(100.0), 30.0);
        assert_eq!(p.apply(f64::NAN), 0.0);
    }

    #[test]
    fn genre_selects_profile() {
        assert_eq!(ThresholdProfile::for_genre(Genre::Techno).name, "relaxed");
        assert_eq!(ThresholdProfile::for_genre(Genre::Jazz).name, "strict");
        assert_eq!(ThresholdProfile::from("dubstep").passing_score, 60.0);
        assert_eq!(ThresholdProfile::from("strict").passing_score, 85.0);
    }

    #[test]
    fn profile_json_roundtrip() {
        let profile = ThresholdProfile::relaxed();
        let json = serde_json::to_string(&profile).unwrap();
        let parsed: ThresholdProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }
}
