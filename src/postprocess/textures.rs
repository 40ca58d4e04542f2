//! Stereo fill textures: vinyl noise, room tone and ambient pads

use std::f64::consts::PI;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::dsp::filter::{apply_cascade, butterworth_bandpass, butterworth_highpass, butterworth_lowpass};
use crate::dsp::noise::{pink, white};

/// Left and right planes of equal length
pub type StereoTexture = [Vec<f32>; 2];

/// Gaussian-equivalent scale for uniform noise of a given standard deviation
const UNIFORM_FOR_STD: f64 = 1.732_050_807_568_877_2;

fn sine(freq: f64, phase: f64, len: usize, sample_rate: u32, amplitude: f64) -> Vec<f32> {
    let sr = sample_rate as f64;
    (0..len)
        .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sr + phase).sin()) as f32)
        .collect()
}

/// Hiss with decaying crackle pops and turntable rumble
pub fn vinyl_noise(rng: &mut Pcg32, len: usize, sample_rate: u32) -> StereoTexture {
    let mut noise = white(rng, len, 0.05 * UNIFORM_FOR_STD);

    // Roughly three pops per second
    let pops = (len as f64 / sample_rate as f64 * 3.0) as usize;
    if len > 100 {
        for _ in 0..pops {
            let pos = rng.gen_range(0..len - 100);
            let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            let amplitude = rng.gen_range(0.1..0.3) * sign;
            let pop_len = rng.gen_range(20..80);
            for k in 0..pop_len.min(len - pos) {
                noise[pos + k] += (amplitude * (-(k as f64) / 10.0).exp()) as f32;
            }
        }
    }

    apply_cascade(&butterworth_highpass(2, 20.0, sample_rate), &mut noise);
    apply_cascade(&butterworth_lowpass(1, 12_000.0, sample_rate), &mut noise);

    let rumble_a = sine(33.0, 0.0, len, sample_rate, 0.02);
    let rumble_b = sine(45.0, 1.2, len, sample_rate, 0.015);

    let left = (0..len).map(|i| noise[i] + rumble_a[i] + rumble_b[i]).collect();
    let right = (0..len)
        .map(|i| noise[i] * 0.95 + (rumble_a[i] + rumble_b[i]) * 1.05)
        .collect();
    [left, right]
}

/// Band-limited pink noise with low rumble, decorrelated per channel
pub fn room_tone(rng: &mut Pcg32, len: usize, sample_rate: u32) -> StereoTexture {
    let band = butterworth_bandpass(2, 100.0, 2000.0, sample_rate);
    let rumble: Vec<f32> = sine(40.0, 0.0, len, sample_rate, 0.01)
        .into_iter()
        .zip(sine(55.0, 0.7, len, sample_rate, 0.008))
        .map(|(a, b)| a + b)
        .collect();

    let mut left = pink(rng, len, 0.03);
    apply_cascade(&band, &mut left);
    let mut right = pink(rng, len, 0.03);
    apply_cascade(&band, &mut right);

    for i in 0..len {
        left[i] += rumble[i];
        right[i] += rumble[i] * 1.05;
    }
    [left, right]
}

const PAD_ROOTS: [f64; 4] = [65.41, 82.41, 110.0, 130.81];

/// Sustained chord on a random low root with slow vibrato, a long
/// squared fade in/out and a breath of band-passed noise
pub fn ambient_pad(rng: &mut Pcg32, len: usize, sample_rate: u32) -> StereoTexture {
    let sr = sample_rate as f64;
    let root = *PAD_ROOTS.choose(rng).unwrap_or(&110.0);

    let ramp = (len / 4).min((2.0 * sr) as usize);
    let envelope = |i: usize| -> f64 {
        if ramp == 0 {
            return 1.0;
        }
        if i < ramp {
            (i as f64 / ramp as f64).powi(2)
        } else if i >= len - ramp {
            ((len - 1 - i) as f64 / ramp as f64).powi(2)
        } else {
            1.0
        }
    };

    let tone = |i: usize, detune: f64, fifth_detune: f64, with_third: bool| -> f64 {
        let t = i as f64 / sr;
        let mut v = (2.0 * PI * root * detune * t).sin() * 0.3
            + (2.0 * PI * root * 1.5 * fifth_detune * t).sin() * 0.25
            + (2.0 * PI * root * 2.0 * t).sin() * 0.2;
        if with_third {
            v += (2.0 * PI * root * 1.25 * t + 0.1).sin() * 0.15;
            let vibrato = (2.0 * PI * 0.3 * t).sin() * 0.002;
            let wobbled = (2.0 * PI * root * t * (1.0 + vibrato)).sin() * 0.3;
            v = v * 0.7 + wobbled * 0.3;
        }
        v * envelope(i)
    };

    let mut left: Vec<f32> = (0..len).map(|i| tone(i, 1.0, 1.0, true) as f32).collect();
    let mut right: Vec<f32> = (0..len).map(|i| tone(i, 1.001, 0.999, false) as f32).collect();

    let smooth = butterworth_lowpass(2, 3000.0, sample_rate);
    apply_cascade(&smooth, &mut left);
    apply_cascade(&smooth, &mut right);

    let mut breath = white(rng, len, 0.02 * UNIFORM_FOR_STD);
    apply_cascade(&butterworth_bandpass(2, 800.0, 4000.0, sample_rate), &mut breath);
    for i in 0..len {
        left[i] += breath[i];
        right[i] += breath[i] * 0.95;
    }
    [left, right]
}
