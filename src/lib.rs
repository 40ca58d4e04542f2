//! DJ Master - quality-controlled audio production pipeline
//!
//! A composition is rendered into candidate mixes, each candidate is scored
//! by the quality analyzer, and the loop regenerates until a candidate
//! passes or the attempt budget runs out. The best candidate is repaired,
//! humanized and mastered through a six-pass chain:
//! - Analysis: levels, clipping, silence, spectrum, stereo field, loudness
//! - Repair: gap filling, ambience, soft-knee compression
//! - Mastering: corrective EQ, dynamics, saturation, width, limiting, dither

pub mod analysis;
pub mod audio;
pub mod config;
pub mod controller;
pub mod dsp;
pub mod error;
pub mod mastering;
pub mod pipeline;
pub mod postprocess;
pub mod render;
pub mod repair;
pub mod rng;
pub mod types;

pub use analysis::{analyze, QualityReport, ThresholdProfile};
pub use config::PipelineConfig;
pub use controller::{CandidateSource, QualityAnalyzer, RegenerationController};
pub use error::{Error, Result};
pub use mastering::{MasteringChain, MasteringOptions};
pub use pipeline::{Pipeline, Production};
pub use types::{AudioBuffer, Genre, LoudnessTarget, MasteringStyle};
