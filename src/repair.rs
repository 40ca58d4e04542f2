//! Targeted fixes for the best candidate, each gated on a specific problem
//! in its stored report

use rand_pcg::Pcg32;
use rayon::prelude::*;
use tracing::info;

use crate::analysis::{QualityReport, SilenceGap, ThresholdProfile};
use crate::dsp::envelope::envelope_follower;
use crate::dsp::level::{db_to_linear, linear_to_db};
use crate::error::Result;
use crate::postprocess::SilenceFiller;
use crate::types::{AudioBuffer, FixChange};

/// Gates for each fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairSettings {
    /// Gaps longer than this are filled
    pub gap_threshold_seconds: f64,
    /// Ambience is layered in above this silence percentage
    pub silence_percentage_threshold: f64,
    pub ambience_volume: f64,
    /// Dynamic range above this is compressed
    pub max_dynamic_range_db: f64,
}

impl RepairSettings {
    pub fn from_profile(profile: &ThresholdProfile) -> Self {
        Self {
            gap_threshold_seconds: profile.silence_max_gap_seconds,
            silence_percentage_threshold: profile.silence_max_percentage,
            ..Self::default()
        }
    }
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            gap_threshold_seconds: 0.8,
            silence_percentage_threshold: 5.0,
            ambience_volume: 0.1,
            max_dynamic_range_db: 20.0,
        }
    }
}

/// Static soft-knee downward compressor with a stereo-linked envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftKneeCompressor {
    pub threshold_db: f64,
    pub ratio: f64,
    pub knee_db: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
}

impl Default for SoftKneeCompressor {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 3.0,
            knee_db: 6.0,
            attack_ms: 10.0,
            release_ms: 100.0,
        }
    }
}

impl SoftKneeCompressor {
    /// Gain change in dB (never positive) for an input level in dB
    pub fn gain_db(&self, level_db: f64) -> f64 {
        let over = level_db - self.threshold_db;
        let slope = 1.0 / self.ratio.max(1.0) - 1.0;
        if 2.0 * over < -self.knee_db {
            0.0
        } else if self.knee_db > 0.0 && 2.0 * over.abs() <= self.knee_db {
            slope * (over + self.knee_db / 2.0).powi(2) / (2.0 * self.knee_db)
        } else {
            slope * over
        }
    }

    pub fn process(&self, buffer: &mut AudioBuffer) {
        let frames = buffer.frame_count();
        let detector: Vec<f32> = (0..frames)
            .map(|i| buffer.samples.iter().map(|ch| ch[i].abs()).fold(0.0, f32::max))
            .collect();
        let envelope = envelope_follower(&detector, self.attack_ms, self.release_ms, buffer.sample_rate);
        let gains: Vec<f32> = envelope
            .par_iter()
            .map(|&env| db_to_linear(self.gain_db(linear_to_db(env as f64))) as f32)
            .collect();

        buffer.samples.par_iter_mut().for_each(|channel| {
            for (s, g) in channel.iter_mut().zip(&gains) {
                *s *= g;
            }
        });
    }
}

/// Apply every fix whose gate the report trips. The report is the one
/// stored with the candidate; the buffer is not re-analyzed here.
pub fn repair(
    buffer: &AudioBuffer,
    report: &QualityReport,
    settings: &RepairSettings,
    filler: &dyn SilenceFiller,
    rng: &mut Pcg32,
) -> Result<(AudioBuffer, Vec<FixChange>)> {
    buffer.validate()?;
    let mut repaired = buffer.clone();
    let mut changes = Vec::new();

    let long_gaps: Vec<SilenceGap> = report
        .silence_gaps
        .iter()
        .filter(|gap| gap.duration_seconds > settings.gap_threshold_seconds)
        .copied()
        .collect();
    if !long_gaps.is_empty() {
        repaired = filler.fill_gaps(&repaired, &long_gaps, rng);
        let description = format!(
            "Filled {} silence gap(s) longer than {:.1}s",
            long_gaps.len(),
            settings.gap_threshold_seconds
        );
        info!("{}", description);
        changes.push(FixChange {
            module: "silence_fill".to_string(),
            description,
        });
    }

    if report.total_silence_percentage > settings.silence_percentage_threshold {
        repaired = filler.add_ambience(&repaired, settings.ambience_volume, rng);
        let description = format!(
            "Layered ambience under {:.1}% silence",
            report.total_silence_percentage
        );
        info!("{}", description);
        changes.push(FixChange {
            module: "ambience".to_string(),
            description,
        });
    }

    if report.dynamic_range_db > settings.max_dynamic_range_db {
        let compressor = SoftKneeCompressor::default();
        compressor.process(&mut repaired);
        let description = format!(
            "Soft-knee compression ({}:1 above {} dB) for {:.1} dB dynamic range",
            compressor.ratio, compressor.threshold_db, report.dynamic_range_db
        );
        info!("{}", description);
        changes.push(FixChange {
            module: "dynamics".to_string(),
            description,
        });
    }

    Ok((repaired, changes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metrics::silence;
    use crate::analysis::analyze;
    use crate::dsp::level::peak_abs;
    use crate::postprocess::AmbientSilenceFiller;
    use crate::rng::create_rng;

    fn clean_report(buffer: &AudioBuffer) -> QualityReport {
        let mut report = QualityReport::silent("test", buffer.sample_rate, buffer.channels);
        report.total_silence_percentage = 0.0;
        report.dynamic_range_db = 10.0;
        report
    }

    fn tone(frames: usize) -> Vec<f32> {
        (0..frames).map(|i| 0.5 * (i as f32 * 0.05).sin()).collect()
    }

    #[test]
    fn clean_report_changes_nothing() {
        let buffer = AudioBuffer::from_stereo(tone(8000), tone(8000), 8000);
        let report = clean_report(&buffer);
        let (out, changes) = repair(
            &buffer,
            &report,
            &RepairSettings::default(),
            &AmbientSilenceFiller::default(),
            &mut create_rng(1),
        )
        .unwrap();
        assert!(changes.is_empty());
        assert_eq!(out, buffer);
    }

    #[test]
    fn each_gate_fires_independently() {
        let mut left = tone(24_000);
        left[4000..20_000].iter_mut().for_each(|s| *s = 0.0);
        let buffer = AudioBuffer::from_stereo(left.clone(), left, 8000);

        let mut report = clean_report(&buffer);
        report.silence_gaps = vec![SilenceGap {
            start_seconds: 0.5,
            duration_seconds: 2.0,
        }];
        report.dynamic_range_db = 25.0;

        let (out, changes) = repair(
            &buffer,
            &report,
            &RepairSettings::default(),
            &AmbientSilenceFiller::default(),
            &mut create_rng(1),
        )
        .unwrap();

        let modules: Vec<&str> = changes.iter().map(|c| c.module.as_str()).collect();
        assert_eq!(modules, vec!["silence_fill", "dynamics"]);
        assert_eq!(out.frame_count(), buffer.frame_count());
        assert!(peak_abs(&out.samples[0][8000..16_000]) > 0.0);
    }

    #[test]
    fn scattered_short_silence_gets_ambience_only() {
        let sr = 48_000;
        let run = sr as usize / 5;
        // Three 0.2 s holes in every 2 s: 30% silence, no reportable gap
        let mut left = tone(20 * run);
        for (block, chunk) in left.chunks_mut(run).enumerate() {
            if matches!(block % 10, 1 | 4 | 7) {
                chunk.iter_mut().for_each(|s| *s = 0.0);
            }
        }
        let buffer = AudioBuffer::from_stereo(left.clone(), left, sr);

        let profile = ThresholdProfile::strict();
        let report = analyze(&buffer, &profile).unwrap();
        assert!(report.silence_gaps.is_empty());
        assert!(report.total_silence_percentage > profile.silence_max_percentage);

        let (out, changes) = repair(
            &buffer,
            &report,
            &RepairSettings::from_profile(&profile),
            &AmbientSilenceFiller::default(),
            &mut create_rng(3),
        )
        .unwrap();

        let modules: Vec<&str> = changes.iter().map(|c| c.module.as_str()).collect();
        assert_eq!(modules, vec!["ambience"]);
        assert_eq!(out.frame_count(), buffer.frame_count());
        let before = silence(&buffer, profile.min_silence_gap_seconds).total_percentage;
        let after = silence(&out, profile.min_silence_gap_seconds).total_percentage;
        assert!(after < before, "{after} vs {before}");
    }

    #[test]
    fn soft_knee_curve() {
        let comp = SoftKneeCompressor::default();
        assert_eq!(comp.gain_db(-40.0), 0.0);
        assert!((comp.gain_db(-10.0) - (-10.0 * 2.0 / 3.0)).abs() < 1e-9);
        let at_threshold = comp.gain_db(-20.0);
        assert!(at_threshold < 0.0 && at_threshold > -1.0);
        // Continuous at the knee edges
        assert!((comp.gain_db(-23.0)).abs() < 1e-9);
        assert!((comp.gain_db(-17.0) - (-3.0 * 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn compressor_reduces_peaks_only() {
        let mut loud = AudioBuffer::from_mono(vec![0.9; 8000], 8000);
        SoftKneeCompressor::default().process(&mut loud);
        assert!(loud.samples[0][7999] < 0.5);

        let mut quiet = AudioBuffer::from_mono(vec![0.01; 8000], 8000);
        SoftKneeCompressor::default().process(&mut quiet);
        assert!((quiet.samples[0][7999] - 0.01).abs() < 1e-6);
    }
}
