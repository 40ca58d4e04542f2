//! Instrument tags and pitch names

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed set of instruments a composition may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Instrument {
    Kick,
    Snare,
    Hihat,
    OpenHihat,
    Clap,
    Bass,
    SubBass,
    Synth,
    Pad,
    Piano,
    Ambient,
    Wobble,
}

impl Instrument {
    pub const ALL: [Instrument; 12] = [
        Self::Kick,
        Self::Snare,
        Self::Hihat,
        Self::OpenHihat,
        Self::Clap,
        Self::Bass,
        Self::SubBass,
        Self::Synth,
        Self::Pad,
        Self::Piano,
        Self::Ambient,
        Self::Wobble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Snare => "snare",
            Self::Hihat => "hihat",
            Self::OpenHihat => "open-hihat",
            Self::Clap => "clap",
            Self::Bass => "bass",
            Self::SubBass => "sub-bass",
            Self::Synth => "synth",
            Self::Pad => "pad",
            Self::Piano => "piano",
            Self::Ambient => "ambient",
            Self::Wobble => "wobble",
        }
    }

    /// Unpitched one-shots ignore the instruction's frequency and duration
    pub fn is_percussion(&self) -> bool {
        matches!(
            self,
            Self::Kick | Self::Snare | Self::Hihat | Self::OpenHihat | Self::Clap
        )
    }

    /// Pitch used when an instruction gives none
    pub fn default_frequency(&self) -> f64 {
        match self {
            Self::SubBass => 41.2,
            Self::Bass | Self::Wobble => 82.41,
            Self::Pad | Self::Ambient => 220.0,
            Self::Piano => 261.63,
            Self::Synth => 440.0,
            _ => 0.0,
        }
    }
}

impl FromStr for Instrument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase().replace('_', "-");
        let instrument = match tag.as_str() {
            "kick" => Self::Kick,
            "snare" => Self::Snare,
            "hihat" | "hi-hat" | "closed-hihat" => Self::Hihat,
            "open-hihat" | "open-hat" => Self::OpenHihat,
            "clap" => Self::Clap,
            "bass" => Self::Bass,
            "sub-bass" | "subbass" => Self::SubBass,
            "synth" | "lead" => Self::Synth,
            "pad" => Self::Pad,
            "piano" => Self::Piano,
            "ambient" => Self::Ambient,
            "wobble" | "wobble-bass" => Self::Wobble,
            _ => return Err(Error::UnknownInstrument(s.to_string())),
        };
        Ok(instrument)
    }
}

impl TryFrom<String> for Instrument {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Instrument> for String {
    fn from(instrument: Instrument) -> Self {
        instrument.as_str().to_string()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equal-tempered frequency of a pitch name such as "A4", "C#3" or "Eb2"
/// (A4 = 440 Hz)
pub fn note_to_frequency(name: &str) -> Result<f64> {
    let name = name.trim();
    let invalid = || Error::InvalidComposition(format!("invalid pitch name: {name:?}"));

    let mut chars = name.chars();
    let letter = chars.next().ok_or_else(invalid)?;
    let semitone: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(invalid()),
    };

    let rest = chars.as_str();
    let (accidental, octave) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave.parse().map_err(|_| invalid())?;
    if !(-1..=9).contains(&octave) {
        return Err(invalid());
    }

    let midi = (octave + 1) * 12 + semitone + accidental;
    Ok(440.0 * 2f64.powf((midi - 69) as f64 / 12.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tags_parse_and_roundtrip() {
        for instrument in Instrument::ALL {
            assert_eq!(instrument.as_str().parse::<Instrument>().unwrap(), instrument);
        }
        assert_eq!("Sub_Bass".parse::<Instrument>().unwrap(), Instrument::SubBass);
        assert!(matches!(
            "theremin".parse::<Instrument>(),
            Err(Error::UnknownInstrument(tag)) if tag == "theremin"
        ));
    }

    #[test]
    fn pitch_names() {
        assert_relative_eq!(note_to_frequency("A4").unwrap(), 440.0, epsilon = 1e-9);
        assert_relative_eq!(note_to_frequency("C4").unwrap(), 261.6256, epsilon = 1e-3);
        assert_relative_eq!(note_to_frequency("C#3").unwrap(), note_to_frequency("Db3").unwrap());
        assert_relative_eq!(note_to_frequency("E2").unwrap(), 82.4069, epsilon = 1e-3);
        assert!(note_to_frequency("H2").is_err());
        assert!(note_to_frequency("A").is_err());
        assert!(note_to_frequency("").is_err());
    }
}
