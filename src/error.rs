//! Error types for the production pipeline

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can surface to the caller.
///
/// Quality-threshold failures are not errors: they are reported inside the
/// `QualityReport`. Only malformed input and I/O problems end up here.
#[derive(Error, Debug)]
pub enum Error {
    /// Buffer has no frames
    #[error("Audio buffer is empty")]
    EmptyBuffer,

    /// Declared channel count does not match the sample planes
    #[error("Channel count mismatch: declared {declared}, got {actual} planes")]
    ChannelMismatch { declared: usize, actual: usize },

    /// Channel planes have different lengths
    #[error("Channel planes have different lengths")]
    RaggedChannels,

    /// Only mono and stereo are supported
    #[error("Unsupported channel count: {0} (must be 1 or 2)")]
    UnsupportedChannelCount(usize),

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// BS.1770 meter failure
    #[error("Loudness measurement failed: {0}")]
    Loudness(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("FFT failed: {0}")]
    Fft(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Invalid composition: {0}")]
    InvalidComposition(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ebur128::Error> for Error {
    fn from(err: ebur128::Error) -> Self {
        Self::Loudness(format!("{:?}", err))
    }
}

impl From<symphonia::core::errors::Error> for Error {
    fn from(err: symphonia::core::errors::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<realfft::FftError> for Error {
    fn from(err: realfft::FftError) -> Self {
        Self::Fft(err.to_string())
    }
}
