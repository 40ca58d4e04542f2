//! Regeneration loop: synthesize, analyze, keep the best candidate, retry
//! with perturbed variation until a candidate passes or attempts run out

use std::fmt;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::{analyze, QualityReport, ThresholdProfile};
use crate::error::Result;
use crate::rng::{create_derived_rng, create_rng};
use crate::types::AudioBuffer;

/// Produces one full candidate buffer per attempt
pub trait CandidateSource {
    /// `variation` is the synthesis randomization amount for this attempt;
    /// `rng` is private to the attempt.
    fn synthesize(&self, attempt: usize, variation: f64, rng: &mut Pcg32) -> Result<AudioBuffer>;

    /// Variation amount used for the first attempt
    fn initial_variation(&self) -> f64 {
        0.5
    }
}

/// Scores a candidate
pub trait QualityAnalyzer {
    fn analyze(&self, buffer: &AudioBuffer) -> Result<QualityReport>;
}

/// `QualityAnalyzer` backed by a threshold profile
#[derive(Debug, Clone, Default)]
pub struct ProfileAnalyzer {
    pub profile: ThresholdProfile,
}

impl ProfileAnalyzer {
    pub fn new(profile: ThresholdProfile) -> Self {
        Self { profile }
    }
}

impl QualityAnalyzer for ProfileAnalyzer {
    fn analyze(&self, buffer: &AudioBuffer) -> Result<QualityReport> {
        analyze(buffer, &self.profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Synthesizing,
    Analyzing,
    Accepted,
    RejectedRetry,
    RejectedExhausted,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Synthesizing => "synthesizing",
            Self::Analyzing => "analyzing",
            Self::Accepted => "accepted",
            Self::RejectedRetry => "rejected-retry",
            Self::RejectedExhausted => "rejected-exhausted",
        };
        f.write_str(name)
    }
}

/// Score summary of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub attempt: usize,
    pub variation: f64,
    pub score: f64,
    pub passed: bool,
}

/// Best candidate across all attempts, with its report
#[derive(Debug, Clone)]
pub struct Regeneration {
    pub buffer: AudioBuffer,
    pub report: QualityReport,
    /// Zero-based index of the attempt that produced `buffer`
    pub best_attempt: usize,
    pub attempts: Vec<AttemptRecord>,
    pub final_state: ControllerState,
}

impl Regeneration {
    pub fn passed(&self) -> bool {
        self.report.passed
    }
}

/// Fraction by which the variation amount is jittered between attempts
pub const VARIATION_JITTER: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct RegenerationController {
    max_attempts: usize,
    seed: u64,
}

impl RegenerationController {
    /// At least one attempt is always made
    pub fn new(max_attempts: usize, seed: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            seed,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Never fails because no attempt passed: the best candidate is returned
    /// either way. Synthesis and layout errors propagate.
    pub fn run<S, A>(&self, source: &S, analyzer: &A) -> Result<Regeneration>
    where
        S: CandidateSource + ?Sized,
        A: QualityAnalyzer + ?Sized,
    {
        let mut control_rng = create_rng(self.seed);
        let mut variation = source.initial_variation().clamp(0.0, 1.0);
        let mut records = Vec::with_capacity(self.max_attempts);

        let mut attempt = 0;
        let mut best = self.attempt(source, analyzer, attempt, variation, &mut records)?;
        let mut passed = best.report.passed;

        while !passed && attempt + 1 < self.max_attempts {
            let factor = 1.0 + (control_rng.gen::<f64>() * 2.0 - 1.0) * VARIATION_JITTER;
            variation = (variation * factor).clamp(0.0, 1.0);
            info!(
                state = %ControllerState::RejectedRetry,
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                best_score = best.report.overall_score,
                next_variation = variation,
                "Candidate rejected, regenerating"
            );

            attempt += 1;
            let candidate = self.attempt(source, analyzer, attempt, variation, &mut records)?;
            passed = candidate.report.passed;
            // Strict improvement only, so ties keep the earlier attempt
            if candidate.report.overall_score > best.report.overall_score {
                best = candidate;
            }
        }

        let final_state = if passed {
            info!(attempt = attempt + 1, score = best.report.overall_score, "Candidate accepted");
            ControllerState::Accepted
        } else {
            warn!(
                attempts = records.len(),
                best_attempt = best.attempt + 1,
                best_score = best.report.overall_score,
                "No candidate passed, continuing with the best one"
            );
            ControllerState::RejectedExhausted
        };

        Ok(Regeneration {
            buffer: best.buffer,
            report: best.report,
            best_attempt: best.attempt,
            attempts: records,
            final_state,
        })
    }

    fn attempt<S, A>(
        &self,
        source: &S,
        analyzer: &A,
        attempt: usize,
        variation: f64,
        records: &mut Vec<AttemptRecord>,
    ) -> Result<Candidate>
    where
        S: CandidateSource + ?Sized,
        A: QualityAnalyzer + ?Sized,
    {
        debug!(state = %ControllerState::Synthesizing, attempt, variation);
        let mut rng = create_derived_rng(self.seed, attempt as u64);
        let buffer = source.synthesize(attempt, variation, &mut rng)?;

        debug!(state = %ControllerState::Analyzing, attempt);
        let report = analyzer.analyze(&buffer)?;
        records.push(AttemptRecord {
            attempt,
            variation,
            score: report.overall_score,
            passed: report.passed,
        });

        Ok(Candidate {
            buffer,
            report,
            attempt,
        })
    }
}

struct Candidate {
    buffer: AudioBuffer,
    report: QualityReport,
    attempt: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Emits a buffer whose single sample encodes the attempt index
    struct CountingSource {
        calls: Cell<usize>,
        variations: RefCell<Vec<f64>>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                variations: RefCell::new(Vec::new()),
            }
        }
    }

    impl CandidateSource for CountingSource {
        fn synthesize(&self, attempt: usize, variation: f64, _rng: &mut Pcg32) -> Result<AudioBuffer> {
            self.calls.set(self.calls.get() + 1);
            self.variations.borrow_mut().push(variation);
            Ok(AudioBuffer::from_mono(vec![attempt as f32 / 10.0], 48_000))
        }
    }

    /// Returns scripted scores keyed by call order
    struct ScriptedAnalyzer {
        scores: Vec<f64>,
        pass_at: f64,
        calls: Cell<usize>,
    }

    impl ScriptedAnalyzer {
        fn new(scores: &[f64], pass_at: f64) -> Self {
            Self {
                scores: scores.to_vec(),
                pass_at,
                calls: Cell::new(0),
            }
        }
    }

    impl QualityAnalyzer for ScriptedAnalyzer {
        fn analyze(&self, buffer: &AudioBuffer) -> Result<QualityReport> {
            let i = self.calls.get();
            self.calls.set(i + 1);
            let mut report = QualityReport::silent("scripted", buffer.sample_rate, buffer.channels);
            report.overall_score = self.scores[i.min(self.scores.len() - 1)];
            report.passed = report.overall_score >= self.pass_at;
            Ok(report)
        }
    }

    #[test]
    fn keeps_best_not_last() {
        let source = CountingSource::new();
        let analyzer = ScriptedAnalyzer::new(&[40.0, 70.0, 55.0], 85.0);
        let result = RegenerationController::new(3, 7).run(&source, &analyzer).unwrap();

        assert_eq!(source.calls.get(), 3);
        assert_eq!(result.best_attempt, 1);
        assert_eq!(result.report.overall_score, 70.0);
        assert!((result.buffer.samples[0][0] - 0.1).abs() < 1e-6);
        assert_eq!(result.final_state, ControllerState::RejectedExhausted);
        assert!(!result.passed());
    }

    #[test]
    fn stops_on_first_pass() {
        let source = CountingSource::new();
        let analyzer = ScriptedAnalyzer::new(&[50.0, 90.0, 99.0], 85.0);
        let result = RegenerationController::new(5, 7).run(&source, &analyzer).unwrap();

        assert_eq!(source.calls.get(), 2);
        assert_eq!(result.best_attempt, 1);
        assert_eq!(result.final_state, ControllerState::Accepted);
        assert!(result.passed());
    }

    #[test]
    fn ties_keep_earliest() {
        let source = CountingSource::new();
        let analyzer = ScriptedAnalyzer::new(&[60.0, 60.0, 60.0], 85.0);
        let result = RegenerationController::new(3, 1).run(&source, &analyzer).unwrap();
        assert_eq!(result.best_attempt, 0);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let source = CountingSource::new();
        let analyzer = ScriptedAnalyzer::new(&[10.0], 85.0);
        let result = RegenerationController::new(0, 1).run(&source, &analyzer).unwrap();
        assert_eq!(source.calls.get(), 1);
        assert_eq!(result.attempts.len(), 1);
    }

    #[test]
    fn variation_is_jittered_within_ten_percent() {
        let source = CountingSource::new();
        let analyzer = ScriptedAnalyzer::new(&[0.0], 85.0);
        RegenerationController::new(5, 3).run(&source, &analyzer).unwrap();

        let variations = source.variations.borrow();
        assert_eq!(variations[0], 0.5);
        for pair in variations.windows(2) {
            let ratio = pair[1] / pair[0];
            assert!((0.9..=1.1).contains(&ratio), "ratio {ratio}");
        }
    }
}
