//! Layer placement and stereo mixdown

use std::f64::consts::FRAC_PI_4;

use crate::types::AudioBuffer;

/// Where a rendered layer lands in the mix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub start_frame: usize,
    /// -1 (left) ..= 1 (right)
    pub pan: f64,
}

impl Placement {
    pub fn new(start_frame: usize, pan: f64) -> Self {
        Self {
            start_frame,
            pan: pan.clamp(-1.0, 1.0),
        }
    }
}

/// Constant-power gains for a pan position
pub fn pan_gains(pan: f64) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos() as f32, angle.sin() as f32)
}

/// Sum mono layers into a new stereo buffer of `length` frames. Layer
/// material past the end is dropped. Inputs are not modified.
pub fn mix(layers: &[Vec<f32>], positions: &[Placement], length: usize, sample_rate: u32) -> AudioBuffer {
    let mut left = vec![0.0_f32; length];
    let mut right = vec![0.0_f32; length];

    for (layer, placement) in layers.iter().zip(positions) {
        if placement.start_frame >= length {
            continue;
        }
        let (gain_l, gain_r) = pan_gains(placement.pan);
        let end = (placement.start_frame + layer.len()).min(length);
        let span = placement.start_frame..end;

        for ((l, r), &s) in left[span.clone()].iter_mut().zip(&mut right[span]).zip(layer) {
            *l += s * gain_l;
            *r += s * gain_r;
        }
    }

    AudioBuffer::from_stereo(left, right, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_pan_is_constant_power() {
        let (l, r) = pan_gains(0.0);
        assert_relative_eq!(l * l + r * r, 1.0, epsilon = 1e-6);
        assert_relative_eq!(l, r);
        assert!(pan_gains(-1.0).1.abs() < 1e-6);
        assert!(pan_gains(1.0).0.abs() < 1e-6);
    }

    #[test]
    fn layers_are_placed_and_truncated() {
        let layers = vec![vec![1.0; 4], vec![0.5; 10]];
        let positions = [Placement::new(2, -1.0), Placement::new(6, 1.0)];
        let out = mix(&layers, &positions, 8, 100);

        assert_eq!(out.channels, 2);
        assert_eq!(out.frame_count(), 8);
        assert_eq!(out.samples[0][..2], [0.0_f32; 2]);
        assert_relative_eq!(out.samples[0][2], 1.0, epsilon = 1e-6);
        assert_relative_eq!(out.samples[1][7], 0.5, epsilon = 1e-6);
        assert!(out.samples[1][5].abs() < 1e-6);
        assert_eq!(layers[0], vec![1.0; 4]);
    }
}
