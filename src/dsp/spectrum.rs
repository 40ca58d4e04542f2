//! Windowed FFT analysis

use std::sync::Arc;

use rayon::prelude::*;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::Result;

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Start offsets of every analysis frame. A signal shorter than one window
/// still yields a single (zero-padded) frame.
pub fn frame_starts(len: usize, window_size: usize, hop_size: usize) -> Vec<usize> {
    if len == 0 || window_size == 0 {
        return Vec::new();
    }
    if len <= window_size {
        return vec![0];
    }
    let hop = hop_size.max(1);
    let count = (len - window_size) / hop + 1;
    (0..count).map(|i| i * hop).collect()
}

/// Planned FFT plus analysis window, reusable across frame batches
pub struct Stft {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
}

impl Stft {
    pub fn new(window_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(window_size),
            window: hann_window(window_size),
        }
    }

    /// Transform the frames starting at `starts`, in parallel. Frames that
    /// run past the end of `samples` are zero-padded.
    pub fn frames(&self, samples: &[f32], starts: &[usize]) -> Result<Vec<Vec<Complex<f32>>>> {
        let size = self.window.len();
        starts
            .par_iter()
            .map(|&start| {
                let start = start.min(samples.len());
                let end = (start + size).min(samples.len());
                let mut input = vec![0.0_f32; size];
                for ((dst, &src), &w) in input.iter_mut().zip(&samples[start..end]).zip(&self.window) {
                    *dst = src * w;
                }
                let mut spectrum = self.fft.make_output_vec();
                self.fft.process(&mut input, &mut spectrum)?;
                Ok(spectrum)
            })
            .collect()
    }
}

/// Hann-windowed short-time Fourier transform. Returns one half-spectrum
/// (`window_size / 2 + 1` bins) per frame.
pub fn stft(samples: &[f32], window_size: usize, hop_size: usize) -> Result<Vec<Vec<Complex<f32>>>> {
    let starts = frame_starts(samples.len(), window_size, hop_size);
    if starts.is_empty() {
        return Ok(Vec::new());
    }
    Stft::new(window_size).frames(samples, &starts)
}

/// Power (|X|^2) of each bin
pub fn power(spectrum: &[Complex<f32>]) -> Vec<f64> {
    spectrum
        .iter()
        .map(|c| (c.re as f64) * (c.re as f64) + (c.im as f64) * (c.im as f64))
        .collect()
}

/// Magnitude (|X|) of each bin
pub fn magnitude(spectrum: &[Complex<f32>]) -> Vec<f64> {
    spectrum.iter().map(|c| (c.norm_sqr() as f64).sqrt()).collect()
}

/// Center frequency of FFT bin `bin`
pub fn bin_frequency(bin: usize, window_size: usize, sample_rate: u32) -> f64 {
    bin as f64 * sample_rate as f64 / window_size as f64
}
