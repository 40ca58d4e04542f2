//! Noise sources

use rand::Rng;
use rand_pcg::Pcg32;

/// Pinking filter (Paul Kellett's economy approximation, -3 dB/octave)
const PINK_B: [f64; 4] = [0.049922035, -0.095993537, 0.050612699, -0.004408786];
const PINK_A: [f64; 4] = [1.0, -2.494956002, 2.017265875, -0.522189400];

/// Uniform white noise in [-amplitude, amplitude]
pub fn white(rng: &mut Pcg32, len: usize, amplitude: f64) -> Vec<f32> {
    (0..len)
        .map(|_| ((rng.gen::<f64>() * 2.0 - 1.0) * amplitude) as f32)
        .collect()
}

/// Pink noise, scaled by `amplitude`
pub fn pink(rng: &mut Pcg32, len: usize, amplitude: f64) -> Vec<f32> {
    let mut noise = white(rng, len, 1.0);
    lfilter(&PINK_B, &PINK_A, &mut noise);
    let amp = amplitude as f32;
    noise.iter_mut().for_each(|s| *s *= amp);
    noise
}

/// Direct-form I IIR filter of arbitrary order, in place. `a[0]` must be 1.
pub fn lfilter(b: &[f64], a: &[f64], samples: &mut [f32]) {
    let order = b.len().max(a.len());
    let mut x_hist = vec![0.0_f64; order];
    let mut y_hist = vec![0.0_f64; order];

    for sample in samples.iter_mut() {
        let x0 = *sample as f64;
        let mut y0 = b.first().copied().unwrap_or(0.0) * x0;
        for k in 1..order {
            y0 += b.get(k).copied().unwrap_or(0.0) * x_hist[k - 1];
            y0 -= a.get(k).copied().unwrap_or(0.0) * y_hist[k - 1];
        }
        x_hist.rotate_right(1);
        y_hist.rotate_right(1);
        if order > 1 {
            x_hist[0] = x0;
            y_hist[0] = y0;
        }
        *sample = y0 as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    #[test]
    fn white_noise_is_bounded_and_centered() {
        let mut rng = create_rng(1);
        let noise = white(&mut rng, 100_000, 0.5);
        assert!(noise.iter().all(|s| s.abs() <= 0.5));
        let mean = noise.iter().map(|&s| s as f64).sum::<f64>() / noise.len() as f64;
        assert!(mean.abs() < 0.01);
    }

    #[test]
    fn pink_noise_is_stable() {
        let mut rng = create_rng(2);
        let noise = pink(&mut rng, 96_000, 1.0);
        assert!(noise.iter().all(|s| s.is_finite() && s.abs() < 2.0));
    }

    #[test]
    fn lfilter_matches_one_pole() {
        let mut impulse = vec![1.0_f32, 0.0, 0.0, 0.0];
        lfilter(&[1.0], &[1.0, -0.5], &mut impulse);
        assert_eq!(impulse, vec![1.0, 0.5, 0.25, 0.125]);
    }
}
