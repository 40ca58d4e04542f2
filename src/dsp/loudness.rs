//! Loudness and true-peak measurement (ITU-R BS.1770 via ebur128)

use ebur128::{EbuR128, Mode};
use rubato::{FftFixedIn, Resampler};
use tracing::warn;

use crate::dsp::level::{linear_to_db, peak_abs_planes};
use crate::error::{Error, Result};
use crate::types::AudioBuffer;

/// Reported for programme material below the absolute gate
pub const SILENCE_LUFS: f64 = -70.0;

const CHUNK_FRAMES: usize = 4096;
const OVERSAMPLING: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessMeasurement {
    pub integrated_lufs: f64,
    pub loudness_range: f64,
}

/// Integrated loudness and loudness range
pub fn measure_loudness(buffer: &AudioBuffer) -> Result<LoudnessMeasurement> {
    let mode = Mode::I | Mode::LRA;
    let mut ebu = EbuR128::new(buffer.channels as u32, buffer.sample_rate, mode)?;

    let interleaved = buffer.to_interleaved();
    for chunk in interleaved.chunks(CHUNK_FRAMES * buffer.channels.max(1)) {
        ebu.add_frames_f32(chunk)?;
    }

    let integrated = ebu.loudness_global().unwrap_or(SILENCE_LUFS);
    let lra = ebu.loudness_range().unwrap_or(0.0);

    Ok(LoudnessMeasurement {
        integrated_lufs: if integrated.is_finite() { integrated.max(SILENCE_LUFS) } else { SILENCE_LUFS },
        loudness_range: if lra.is_finite() { lra } else { 0.0 },
    })
}

/// Integrated loudness in LUFS. Meter failures degrade to the silence
/// sentinel with a warning.
pub fn integrated_loudness(buffer: &AudioBuffer) -> f64 {
    match measure_loudness(buffer) {
        Ok(m) => m.integrated_lufs,
        Err(e) => {
            warn!("Loudness measurement failed, assuming silence: {}", e);
            SILENCE_LUFS
        }
    }
}

/// True peak (linear) using 4x oversampling. Never below the sample peak.
pub fn true_peak(buffer: &AudioBuffer) -> Result<f64> {
    let sample_peak = peak_abs_planes(&buffer.samples);
    let frame_count = buffer.frame_count();
    if frame_count == 0 {
        return Ok(sample_peak);
    }

    let mut resampler = FftFixedIn::<f32>::new(
        buffer.sample_rate as usize,
        buffer.sample_rate as usize * OVERSAMPLING,
        1024,
        2,
        buffer.channels,
    )
    .map_err(|e| Error::Resample(e.to_string()))?;

    let chunk_size = resampler.input_frames_next();
    let mut max_peak: f32 = 0.0;

    // One extra chunk of zeros flushes the resampler delay line
    let padded_len = frame_count + chunk_size;
    for start in (0..padded_len).step_by(chunk_size) {
        let chunk: Vec<Vec<f32>> = buffer
            .samples
            .iter()
            .map(|ch| {
                let end = (start + chunk_size).min(ch.len());
                let mut part = if start < end { ch[start..end].to_vec() } else { Vec::new() };
                part.resize(chunk_size, 0.0);
                part
            })
            .collect();

        let output = resampler
            .process(&chunk, None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        for ch in &output {
            for &sample in ch {
                max_peak = max_peak.max(sample.abs());
            }
        }
    }

    Ok((max_peak as f64).max(sample_peak))
}

/// True peak in dBTP, falling back to the sample peak if the resampler fails
pub fn true_peak_db(buffer: &AudioBuffer) -> f64 {
    let peak = match true_peak(buffer) {
        Ok(peak) => peak,
        Err(e) => {
            warn!("True peak detection failed, using sample peak: {}", e);
            peak_abs_planes(&buffer.samples)
        }
    };
    linear_to_db(peak)
}
