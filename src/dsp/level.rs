//! Level measurement: RMS, peak and dB conversion

use super::NUMERIC_FLOOR;

/// Root mean square of a slice (0.0 for an empty slice)
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// RMS over several planes treated as one sample population
pub fn rms_planes(planes: &[Vec<f32>]) -> f64 {
    let count: usize = planes.iter().map(|p| p.len()).sum();
    if count == 0 {
        return 0.0;
    }
    let sum_sq: f64 = planes
        .iter()
        .flat_map(|p| p.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();
    (sum_sq / count as f64).sqrt()
}

/// Maximum absolute sample value
pub fn peak_abs(samples: &[f32]) -> f64 {
    samples.iter().fold(0.0_f32, |max, &s| max.max(s.abs())) as f64
}

pub fn peak_abs_planes(planes: &[Vec<f32>]) -> f64 {
    planes.iter().map(|p| peak_abs(p)).fold(0.0, f64::max)
}

/// Linear amplitude to dB with a numerical floor: silence maps to -200 dB
pub fn linear_to_db(value: f64) -> f64 {
    20.0 * (value.abs() + NUMERIC_FLOOR).log10()
}

pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}
