//! Composition data model: an ordered list of render instructions loaded
//! from JSON and validated up front

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Genre;

use super::instrument::{note_to_frequency, Instrument};

/// One note or hit to render and place on the timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderInstruction {
    pub instrument: Instrument,
    pub frequency_hz: f64,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    /// 0..=1
    pub velocity: f64,
    /// -1 (left) ..= 1 (right)
    pub pan: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub title: String,
    pub genre: Genre,
    /// Fixed output length; derived from the instructions when absent
    pub duration_seconds: Option<f64>,
    /// Synthesis randomization amount, 0..=1
    pub variation: f64,
    pub instructions: Vec<RenderInstruction>,
}

#[derive(Debug, Deserialize)]
struct RawInstruction {
    instrument: String,
    #[serde(default)]
    frequency_hz: Option<f64>,
    #[serde(default)]
    note: Option<String>,
    start_seconds: f64,
    #[serde(default = "default_duration")]
    duration_seconds: f64,
    #[serde(default = "default_velocity")]
    velocity: f64,
    #[serde(default)]
    pan: f64,
}

#[derive(Debug, Deserialize)]
struct RawComposition {
    #[serde(default)]
    title: String,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    duration_seconds: Option<f64>,
    #[serde(default = "default_variation")]
    variation: f64,
    instructions: Vec<RawInstruction>,
}

fn default_duration() -> f64 {
    0.5
}

fn default_velocity() -> f64 {
    1.0
}

fn default_variation() -> f64 {
    0.5
}

impl RawInstruction {
    fn validate(self, index: usize) -> Result<RenderInstruction> {
        let instrument: Instrument = self.instrument.parse()?;
        let invalid = |what: &str| Error::InvalidComposition(format!("instruction {index}: {what}"));

        if !self.start_seconds.is_finite() || self.start_seconds < 0.0 {
            return Err(invalid("start_seconds must be a non-negative number"));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(invalid("duration_seconds must be positive"));
        }
        if !self.velocity.is_finite() || !self.pan.is_finite() {
            return Err(invalid("velocity and pan must be finite"));
        }

        let frequency_hz = match (self.frequency_hz, self.note.as_deref()) {
            (Some(freq), _) if freq.is_finite() && freq > 0.0 => freq,
            (Some(_), _) => return Err(invalid("frequency_hz must be positive")),
            (None, Some(note)) => note_to_frequency(note)?,
            (None, None) => instrument.default_frequency(),
        };

        Ok(RenderInstruction {
            instrument,
            frequency_hz,
            start_seconds: self.start_seconds,
            duration_seconds: self.duration_seconds,
            velocity: self.velocity.clamp(0.0, 1.0),
            pan: self.pan.clamp(-1.0, 1.0),
        })
    }
}

impl Composition {
    /// Parse and validate. Unknown instrument tags and malformed timing are
    /// rejected here, never at render time.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawComposition = serde_json::from_str(json)?;

        if let Some(duration) = raw.duration_seconds {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(Error::InvalidComposition(
                    "duration_seconds must be positive".to_string(),
                ));
            }
        }
        if raw.instructions.is_empty() {
            return Err(Error::InvalidComposition("no instructions".to_string()));
        }

        let instructions = raw
            .instructions
            .into_iter()
            .enumerate()
            .map(|(i, instruction)| instruction.validate(i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            title: raw.title,
            genre: raw.genre.as_deref().map(Genre::from).unwrap_or(Genre::Pop),
            duration_seconds: raw.duration_seconds,
            variation: if raw.variation.is_finite() { raw.variation.clamp(0.0, 1.0) } else { default_variation() },
            instructions,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
