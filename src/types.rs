//! Shared type definitions for the production pipeline

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default processing sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 96_000;

/// Planar float audio buffer, samples normalized to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<Vec<f32>>, // One plane per channel
    pub sample_rate: u32,
    pub channels: usize,
}

impl AudioBuffer {
    pub fn new(channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![Vec::new(); channels],
            sample_rate,
            channels,
        }
    }

    /// Silent buffer of the given length
    pub fn silent(channels: usize, sample_rate: u32, frames: usize) -> Self {
        Self {
            samples: vec![vec![0.0; frames]; channels],
            sample_rate,
            channels,
        }
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: vec![samples],
            sample_rate,
            channels: 1,
        }
    }

    pub fn from_stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: vec![left, right],
            sample_rate,
            channels: 2,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn frame_count(&self) -> usize {
        if self.samples.is_empty() {
            0
        } else {
            self.samples[0].len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Check the layout invariants: 1 or 2 planes of equal length matching
    /// the declared channel count and a non-zero sample rate.
    pub fn validate(&self) -> Result<()> {
        if self.channels != self.samples.len() {
            return Err(Error::ChannelMismatch {
                declared: self.channels,
                actual: self.samples.len(),
            });
        }
        if !(1..=2).contains(&self.channels) {
            return Err(Error::UnsupportedChannelCount(self.channels));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }
        let frames = self.frame_count();
        if self.samples.iter().any(|ch| ch.len() != frames) {
            return Err(Error::RaggedChannels);
        }
        Ok(())
    }

    /// Like `validate`, additionally rejecting zero-length buffers
    pub fn validate_non_empty(&self) -> Result<()> {
        self.validate()?;
        if self.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        Ok(())
    }

    /// Average of all channels
    pub fn mono_mix(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples[0].clone();
        }
        let scale = 1.0 / self.channels as f32;
        (0..self.frame_count())
            .map(|i| self.samples.iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Frame-major samples, as ebur128 and hound consume them
    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.frame_count();
        let mut interleaved = Vec::with_capacity(frames * self.channels);
        for i in 0..frames {
            for ch in &self.samples {
                interleaved.push(ch[i]);
            }
        }
        interleaved
    }

    /// Clamp every sample to [-1, 1]. The pipeline calls this exactly once,
    /// right before handing the buffer to the export layer.
    pub fn clip_for_export(&mut self) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }
}

/// Mastering style, selected once per mastering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteringStyle {
    Warm,
    Balanced,
    Bright,
    Aggressive,
}

impl From<&str> for MasteringStyle {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "warm" => Self::Warm,
            "bright" => Self::Bright,
            "aggressive" => Self::Aggressive,
            _ => Self::Balanced,
        }
    }
}

impl std::fmt::Display for MasteringStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Warm => "warm",
            Self::Balanced => "balanced",
            Self::Bright => "bright",
            Self::Aggressive => "aggressive",
        };
        f.write_str(name)
    }
}

/// Loudness target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoudnessTarget {
    Streaming,    // -14 LUFS
    Club,         // -11 LUFS
    Loud,         // -8 LUFS
    Custom(f64),
}

impl LoudnessTarget {
    pub fn lufs_value(&self) -> f64 {
        match self {
            Self::Streaming => -14.0,
            Self::Club => -11.0,
            Self::Loud => -8.0,
            Self::Custom(lufs) => *lufs,
        }
    }
}

impl From<&str> for LoudnessTarget {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "streaming" | "low" => Self::Streaming,
            "loud" | "high" => Self::Loud,
            other => other
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Custom)
                .unwrap_or(Self::Club),
        }
    }
}

/// Genre metadata. Drives the mastering style and the threshold profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Dubstep,
    DrumAndBass,
    Trap,
    House,
    Techno,
    Trance,
    Electro,
    Lofi,
    Jazz,
    Funk,
    Ambient,
    Pop,
    Broadcast,
}

impl Genre {
    /// Electronic/club material is judged with the relaxed profile
    pub fn is_electronic(&self) -> bool {
        matches!(
            self,
            Self::Dubstep
                | Self::DrumAndBass
                | Self::Trap
                | Self::House
                | Self::Techno
                | Self::Trance
                | Self::Electro
                | Self::Lofi
                | Self::Funk
        )
    }

    pub fn mastering_style(&self) -> MasteringStyle {
        match self {
            Self::Lofi | Self::Jazz | Self::Ambient => MasteringStyle::Warm,
            Self::Trance | Self::Techno | Self::Electro => MasteringStyle::Bright,
            Self::Dubstep | Self::DrumAndBass | Self::Trap => MasteringStyle::Aggressive,
            Self::House | Self::Funk | Self::Pop | Self::Broadcast => MasteringStyle::Balanced,
        }
    }
}

impl From<&str> for Genre {
    fn from(s: &str) -> Self {
        match s.to_lowercase().replace(|c: char| c == '_' || c == ' ', "-").as_str() {
            "dubstep" | "riddim" | "brostep" => Self::Dubstep,
            "dnb" | "drum-and-bass" | "drum-n-bass" | "jungle" => Self::DrumAndBass,
            "trap" | "hip-hop" | "hiphop" => Self::Trap,
            "house" | "deep-house" => Self::House,
            "techno" => Self::Techno,
            "trance" => Self::Trance,
            "electro" | "edm" | "electronic" => Self::Electro,
            "lofi" | "lo-fi" | "chillhop" => Self::Lofi,
            "jazz" => Self::Jazz,
            "funk" => Self::Funk,
            "ambient" | "chill" => Self::Ambient,
            "broadcast" | "podcast" | "radio" => Self::Broadcast,
            _ => Self::Pop,
        }
    }
}

/// Fix operation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixChange {
    pub module: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_layouts() {
        let mut buffer = AudioBuffer::silent(2, 48_000, 10);
        assert!(buffer.validate().is_ok());

        buffer.channels = 1;
        assert!(matches!(
            buffer.validate(),
            Err(Error::ChannelMismatch { declared: 1, actual: 2 })
        ));

        let ragged = AudioBuffer::from_stereo(vec![0.0; 4], vec![0.0; 3], 48_000);
        assert!(matches!(ragged.validate(), Err(Error::RaggedChannels)));

        let surround = AudioBuffer::silent(6, 48_000, 10);
        assert!(matches!(
            surround.validate(),
            Err(Error::UnsupportedChannelCount(6))
        ));

        let empty = AudioBuffer::new(1, 48_000);
        assert!(empty.validate().is_ok());
        assert!(matches!(empty.validate_non_empty(), Err(Error::EmptyBuffer)));
    }

    #[test]
    fn interleaving_is_frame_major() {
        let buffer = AudioBuffer::from_stereo(vec![0.1, 0.2], vec![-0.1, -0.2], 44_100);
        assert_eq!(buffer.to_interleaved(), vec![0.1, -0.1, 0.2, -0.2]);
        assert!(AudioBuffer::new(2, 44_100).to_interleaved().is_empty());
    }

    #[test]
    fn loudness_target_parses_presets_and_numbers() {
        assert_eq!(LoudnessTarget::from("streaming").lufs_value(), -14.0);
        assert_eq!(LoudnessTarget::from("loud").lufs_value(), -8.0);
        assert_eq!(LoudnessTarget::from("-9.5").lufs_value(), -9.5);
        assert_eq!(LoudnessTarget::from("whatever").lufs_value(), -11.0);
    }

    #[test]
    fn genre_selects_style() {
        assert_eq!(Genre::from("Dubstep").mastering_style(), MasteringStyle::Aggressive);
        assert_eq!(Genre::from("lo-fi").mastering_style(), MasteringStyle::Warm);
        assert_eq!(Genre::from("techno").mastering_style(), MasteringStyle::Bright);
        assert!(!Genre::from("podcast").is_electronic());
    }
}
