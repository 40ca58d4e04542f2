//! End-to-end production: regenerate until a candidate passes, repair it,
//! humanize, master, clip once for export and re-analyze for the report

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::{analyze, QualityReport, ThresholdProfile};
use crate::config::PipelineConfig;
use crate::controller::{AttemptRecord, CandidateSource, ProfileAnalyzer, RegenerationController};
use crate::error::Result;
use crate::mastering::{MasteringChain, MasteringOptions};
use crate::postprocess::{AmbientSilenceFiller, Humanizer, PostProcessor, SilenceFiller};
use crate::repair::{repair, RepairSettings};
use crate::rng::{create_derived_rng, derive_seed};
use crate::types::{AudioBuffer, FixChange, Genre, MasteringStyle};

// Random streams for the stages after regeneration, far above any attempt
// index
const REPAIR_STREAM: u64 = 1 << 32;
const HUMANIZE_STREAM: u64 = (1 << 32) + 1;
const DITHER_STREAM: u64 = (1 << 32) + 2;

/// Everything `produce` hands back
#[derive(Debug, Clone, Serialize)]
pub struct Production {
    #[serde(skip)]
    pub buffer: AudioBuffer,
    pub style: MasteringStyle,
    /// Diagnostic report on the final buffer; absent with quality control off
    pub report: Option<QualityReport>,
    pub attempts: Vec<AttemptRecord>,
    pub best_attempt: Option<usize>,
    pub fixes: Vec<FixChange>,
}

pub struct Pipeline {
    config: PipelineConfig,
    profile: Option<ThresholdProfile>,
    filler: Box<dyn SilenceFiller>,
    humanizer: Box<dyn PostProcessor>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            profile: None,
            filler: Box::new(AmbientSilenceFiller::default()),
            humanizer: Box::new(Humanizer::default()),
        }
    }

    /// Judge with this profile instead of the genre's
    pub fn with_profile(mut self, profile: ThresholdProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_silence_filler(mut self, filler: Box<dyn SilenceFiller>) -> Self {
        self.filler = filler;
        self
    }

    pub fn with_humanizer(mut self, humanizer: Box<dyn PostProcessor>) -> Self {
        self.humanizer = humanizer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn profile_for(&self, genre: Genre) -> ThresholdProfile {
        self.profile.clone().unwrap_or_else(|| ThresholdProfile::for_genre(genre))
    }

    fn mastering_chain(&self, style: MasteringStyle) -> MasteringChain {
        MasteringChain::new(MasteringOptions {
            target_lufs: self.config.target_lufs,
            style,
            apply_saturation: self.config.apply_saturation,
            enhance_stereo: self.config.enhance_stereo,
            bit_depth: self.config.export_bit_depth,
            dither_seed: derive_seed(self.config.seed, DITHER_STREAM),
        })
    }

    /// Composition to export-ready buffer. Never fails because quality
    /// thresholds were missed; the best candidate ships with its report.
    pub fn produce<S>(&self, source: &S, genre: Genre) -> Result<Production>
    where
        S: CandidateSource + ?Sized,
    {
        let style = genre.mastering_style();
        let profile = self.profile_for(genre);
        info!(
            "Producing {:?} ({} style, profile {}, up to {} attempts)",
            genre, style, profile.name, self.config.max_regeneration_attempts
        );

        let (candidate, attempts, best_attempt, fixes) = if self.config.quality_control {
            let controller = RegenerationController::new(self.config.max_regeneration_attempts, self.config.seed);
            let regeneration = controller.run(source, &ProfileAnalyzer::new(profile.clone()))?;
            regeneration.buffer.validate_non_empty()?;

            debug!("Repairing attempt {}", regeneration.best_attempt + 1);
            let mut rng = create_derived_rng(self.config.seed, REPAIR_STREAM);
            let (repaired, fixes) = repair(
                &regeneration.buffer,
                &regeneration.report,
                &RepairSettings::from_profile(&profile),
                self.filler.as_ref(),
                &mut rng,
            )?;
            (repaired, regeneration.attempts, Some(regeneration.best_attempt), fixes)
        } else {
            let mut rng = create_derived_rng(self.config.seed, 0);
            let buffer = source.synthesize(0, source.initial_variation(), &mut rng)?;
            buffer.validate_non_empty()?;
            (buffer, Vec::new(), None, Vec::new())
        };

        let (buffer, report) = self.finish(candidate, style, &profile, self.config.humanize)?;
        Ok(Production {
            buffer,
            report,
            style,
            attempts,
            best_attempt,
            fixes,
        })
    }

    /// Master an existing buffer: no regeneration, repair or humanization
    pub fn master_only(&self, buffer: &AudioBuffer, style: MasteringStyle) -> Result<(AudioBuffer, Option<QualityReport>)> {
        buffer.validate_non_empty()?;
        let profile = self.profile.clone().unwrap_or_default();
        self.finish(buffer.clone(), style, &profile, false)
    }

    /// Optionally humanize, then master and clip once for export. With
    /// quality control on, the result is re-analyzed for the returned
    /// report only.
    fn finish(
        &self,
        candidate: AudioBuffer,
        style: MasteringStyle,
        profile: &ThresholdProfile,
        humanize: bool,
    ) -> Result<(AudioBuffer, Option<QualityReport>)> {
        let mut buffer = candidate;

        if humanize {
            debug!("Post-processing: {}", self.humanizer.name());
            let mut rng = create_derived_rng(self.config.seed, HUMANIZE_STREAM);
            buffer = self.humanizer.process(&buffer, &mut rng);
        }

        if self.config.master {
            buffer = self.mastering_chain(style).master(&buffer)?;
        }

        buffer.clip_for_export();

        let report = if self.config.quality_control {
            let report = analyze(&buffer, profile)?;
            log_verdict(&report);
            Some(report)
        } else {
            None
        };
        Ok((buffer, report))
    }
}

fn log_verdict(report: &QualityReport) {
    info!(
        score = report.overall_score,
        passed = report.passed,
        lufs = report.integrated_lufs,
        true_peak_db = report.true_peak_db,
        "Final quality: {:.1}/100 ({})",
        report.overall_score,
        if report.passed { "PASSED" } else { "FAILED" }
    );
}
