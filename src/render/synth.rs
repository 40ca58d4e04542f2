//! Built-in instrument renderer: layered oscillators, filtered noise and
//! envelopes for each instrument tag

use std::f64::consts::PI;

use rand::Rng;
use rand_pcg::Pcg32;

use crate::dsp::filter::{bandpass, butterworth_lowpass, filtfilt, Biquad};
use crate::dsp::level::peak_abs;
use crate::dsp::noise::white;

use super::instrument::Instrument;

/// Everything a renderer needs for one note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub instrument: Instrument,
    pub frequency_hz: f64,
    pub duration_seconds: f64,
    pub velocity: f64,
    /// Randomization amount, 0..=1
    pub variation: f64,
    pub sample_rate: u32,
}

/// Produces a mono sample buffer for one request
pub trait InstrumentRenderer: Send + Sync {
    fn render(&self, request: &RenderRequest, rng: &mut Pcg32) -> Vec<f32>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthRenderer;

impl InstrumentRenderer for SynthRenderer {
    fn render(&self, request: &RenderRequest, rng: &mut Pcg32) -> Vec<f32> {
        let sr = request.sample_rate;
        let variation = request.variation.clamp(0.0, 1.0);
        let freq = request.frequency_hz;
        let dur = request.duration_seconds;

        let (mut signal, peak) = match request.instrument {
            Instrument::Kick => (kick(sr, variation, rng), 0.92),
            Instrument::Snare => (snare(sr, 0.25, variation, rng), 0.88),
            Instrument::Clap => (snare(sr, 0.15, variation, rng), 0.8),
            Instrument::Hihat => (hihat(sr, true, variation, rng), 0.65),
            Instrument::OpenHihat => (hihat(sr, false, variation, rng), 0.7),
            Instrument::Bass => (bass(sr, freq, dur), 0.9),
            Instrument::SubBass => (sub_bass(sr, freq, dur), 0.95),
            Instrument::Synth => (lead(sr, freq, dur, variation, rng), 0.8),
            Instrument::Pad => (pad(sr, freq, dur, variation, rng), 0.7),
            Instrument::Piano => (piano(sr, freq, dur, variation, rng), 0.9),
            Instrument::Ambient => (ambient(sr, freq, dur), 0.6),
            Instrument::Wobble => (wobble(sr, freq, dur, variation, rng), 0.708),
        };

        normalize(&mut signal, peak * request.velocity.clamp(0.0, 1.0));
        signal
    }
}

/// Uniform jitter in [-range, range] scaled by the variation amount
fn jitter(rng: &mut Pcg32, range: f64, variation: f64) -> f64 {
    (rng.gen::<f64>() * 2.0 - 1.0) * range * variation
}

fn frames(duration: f64, sample_rate: u32) -> usize {
    (duration.max(0.0) * sample_rate as f64).round() as usize
}

fn time(i: usize, sample_rate: u32) -> f64 {
    i as f64 / sample_rate as f64
}

fn saw(phase: f64) -> f64 {
    2.0 * (phase - phase.floor()) - 1.0
}

fn square(phase: f64) -> f64 {
    if phase - phase.floor() < 0.5 {
        1.0
    } else {
        -1.0
    }
}

/// Scale so the absolute peak equals `target`; silent input stays silent
fn normalize(signal: &mut [f32], target: f64) {
    let peak = peak_abs(signal);
    if peak > 0.0 {
        let gain = (target / peak) as f32;
        signal.iter_mut().for_each(|s| *s *= gain);
    }
}

/// Linear fade-in/fade-out over the given frame counts, clamped to half
/// the signal each
fn fade(signal: &mut [f32], attack: usize, release: usize) {
    let n = signal.len();
    let attack = attack.min(n / 2);
    let release = release.min(n / 2);
    for i in 0..attack {
        signal[i] *= i as f32 / attack as f32;
    }
    for i in 0..release {
        signal[n - 1 - i] *= i as f32 / release as f32;
    }
}

/// Attack/decay/sustain/release envelope in seconds
fn adsr(n: usize, sample_rate: u32, attack: f64, decay: f64, sustain: f64, release: f64) -> Vec<f32> {
    let a = frames(attack, sample_rate).min(n);
    let d = frames(decay, sample_rate).min(n - a);
    let r = frames(release, sample_rate).min(n - a - d);
    let s_end = n - r;

    (0..n)
        .map(|i| {
            let level = if i < a {
                i as f64 / a as f64
            } else if i < a + d {
                1.0 - (1.0 - sustain) * (i - a) as f64 / d as f64
            } else if i < s_end {
                sustain
            } else {
                sustain * (1.0 - (i - s_end) as f64 / r as f64)
            };
            level as f32
        })
        .collect()
}

fn kick(sr: u32, variation: f64, rng: &mut Pcg32) -> Vec<f32> {
    let n = frames(0.6, sr);
    let attack_freq = 150.0 + jitter(rng, 10.0, variation);
    let decay_freq = 45.0 + jitter(rng, 3.0, variation);
    let body_freq = 65.0 + jitter(rng, 2.0, variation);
    let click_freq = 3500.0 + jitter(rng, 500.0, variation);
    let attack_frames = frames(0.001, sr).max(1);

    let noise = bandpass(&white(rng, n, 1.0), 200.0, 800.0, sr, 4);

    let mut phase = 0.0;
    (0..n)
        .map(|i| {
            let t = time(i, sr);
            phase += 2.0 * PI * (attack_freq * (-30.0 * t).exp() + decay_freq) / sr as f64;
            let attack = if i < attack_frames { (i as f64 / attack_frames as f64).powf(0.3) } else { 1.0 };
            let beater = phase.sin() * attack;

            let body = ((2.0 * PI * body_freq * t).sin() + 0.5 * (4.0 * PI * body_freq * t).sin())
                * (-3.5 * t).exp()
                * (1.0 - (-50.0 * t).exp());
            let click = (2.0 * PI * click_freq * t).sin() * (-250.0 * t).exp() * 0.3;
            let head = noise[i] as f64 * (-40.0 * t).exp() * 0.15;
            let room = (2.0 * PI * 80.0 * t).sin() * (-2.0 * t).exp() * (1.0 - (-10.0 * t).exp()) * 0.2;

            let mix = beater * 0.9 + body * 0.85 + click * 0.4 + head * 0.25 + room * 0.3;
            (mix * (-3.8 * t).exp() * 1.2).tanh() as f32
        })
        .collect()
}

fn snare(sr: u32, duration: f64, variation: f64, rng: &mut Pcg32) -> Vec<f32> {
    let n = frames(duration, sr);
    let head_freq = 200.0 + jitter(rng, 15.0, variation);
    let body_freq = 350.0 + jitter(rng, 20.0, variation);
    let wires = bandpass(&white(rng, n, 1.0), 3000.0, 10_000.0, sr, 6);
    let stick = bandpass(&white(rng, n, 1.0), 2000.0, 8000.0, sr, 4);

    (0..n)
        .map(|i| {
            let t = time(i, sr);
            let w = 2.0 * PI * head_freq * t;
            let head = (w.sin() + 0.4 * (w * 1.7).sin() + 0.2 * (w * 2.3).sin()) * (-18.0 * t).exp();
            let wire = wires[i] as f64 * ((-12.0 * t).exp() + 0.15 * (-6.0 * t).exp());
            let attack = stick[i] as f64 * (-80.0 * t).exp() * 0.8;
            let body = (2.0 * PI * body_freq * t).sin() * (-25.0 * t).exp() * 0.3;

            let mix = head * 0.5 + wire * 0.9 + attack * 0.6 + body * 0.4;
            (mix * 1.5).tanh() as f32
        })
        .collect()
}

const CYMBAL_RESONANCES: [f64; 4] = [7500.0, 9300.0, 11_200.0, 13_400.0];

fn hihat(sr: u32, closed: bool, variation: f64, rng: &mut Pcg32) -> Vec<f32> {
    let (duration, low, high, decay) = if closed {
        (0.15, 6000.0, 14_000.0, 35.0 + jitter(rng, 5.0, variation))
    } else {
        (0.35, 4000.0, 16_000.0, 8.0 + jitter(rng, 2.0, variation))
    };
    let n = frames(duration, sr);
    let mut metal = bandpass(&white(rng, n, 1.0), low, high, sr, 8);

    let nyquist = sr as f64 / 2.0;
    for base in CYMBAL_RESONANCES {
        let freq = base + (rng.gen::<f64>() * 2.0 - 1.0) * 100.0;
        if freq >= nyquist * 0.9 {
            continue;
        }
        for (i, s) in metal.iter_mut().enumerate() {
            *s += ((2.0 * PI * freq * time(i, sr)).sin() * 0.15) as f32;
        }
    }

    let attack_frames = frames(0.002, sr).max(1);
    metal
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let t = time(i, sr);
            let attack = if i < attack_frames { (i as f64 / attack_frames as f64).powf(0.2) } else { 1.0 };
            (s as f64 * (-decay * t).exp() * attack * 1.1).tanh() as f32
        })
        .collect()
}

/// Sawtooth with a sub-octave sine at -6 dB
fn bass(sr: u32, freq: f64, duration: f64) -> Vec<f32> {
    let n = frames(duration, sr);
    let mut signal: Vec<f32> = (0..n)
        .map(|i| {
            let t = time(i, sr);
            (saw(freq * t) + 0.5 * (PI * freq * t).sin()) as f32
        })
        .collect();
    fade(&mut signal, n / 20, n / 5);
    signal
}

fn sub_bass(sr: u32, freq: f64, duration: f64) -> Vec<f32> {
    let n = frames(duration, sr);
    let mut signal: Vec<f32> = (0..n)
        .map(|i| {
            let w = 2.0 * PI * freq * time(i, sr);
            (w.sin() + 0.3 * (2.0 * w).sin() + 0.1 * (3.0 * w).sin()) as f32
        })
        .collect();
    fade(&mut signal, frames(0.02, sr), frames(0.1, sr));
    signal
}

fn lead(sr: u32, freq: f64, duration: f64, variation: f64, rng: &mut Pcg32) -> Vec<f32> {
    let n = frames(duration, sr);
    let detune = 2f64.powf(jitter(rng, 5.0, variation) / 1200.0);
    let f = freq * detune;
    let mut signal: Vec<f32> = (0..n).map(|i| saw(f * time(i, sr)) as f32).collect();
    fade(&mut signal, frames(0.05, sr).min(n / 10), frames(0.1, sr).min(n / 5));
    signal
}

const PAD_DETUNE_CENTS: [f64; 5] = [-7.0, -3.0, 0.0, 3.0, 7.0];

fn pad(sr: u32, freq: f64, duration: f64, variation: f64, rng: &mut Pcg32) -> Vec<f32> {
    let n = frames(duration, sr);
    let spread = 1.0 + jitter(rng, 0.3, variation);
    let voices: Vec<f64> = PAD_DETUNE_CENTS
        .iter()
        .map(|cents| freq * 2f64.powf(cents * spread / 1200.0))
        .collect();

    let attack = frames(0.5, sr).min(n / 2);
    let release = frames(0.8, sr).min(n / 2);
    let signal: Vec<f32> = (0..n)
        .map(|i| {
            let t = time(i, sr);
            let sum: f64 = voices
                .iter()
                .map(|&f| 0.6 * (2.0 * PI * f * t).sin() + 0.4 * saw(f * t))
                .sum();
            let mut env = 1.0;
            if i < attack {
                env = (i as f64 / attack as f64).powi(2);
            }
            if i >= n - release {
                env *= ((n - 1 - i) as f64 / release as f64).powi(2);
            }
            (sum / voices.len() as f64 * env) as f32
        })
        .collect();

    let brightness = 0.5 + jitter(rng, 0.2, variation);
    filtfilt(&butterworth_lowpass(2, 500.0 + brightness * 3000.0, sr), &signal)
}

const PIANO_HARMONICS: [(f64, f64); 8] = [
    (1.0, 1.0),
    (2.0, 0.8),
    (3.0, 0.6),
    (4.0, 0.4),
    (5.0, 0.25),
    (6.0, 0.15),
    (7.0, 0.1),
    (8.0, 0.05),
];

fn piano(sr: u32, freq: f64, duration: f64, variation: f64, rng: &mut Pcg32) -> Vec<f32> {
    let n = frames(duration, sr);
    // Slight string stiffness stretches the upper partials
    let stiffness = 1e-4 * (1.0 + jitter(rng, 0.5, variation));
    let nyquist = sr as f64 / 2.0;
    let partials: Vec<(f64, f64)> = PIANO_HARMONICS
        .iter()
        .map(|&(h, amp)| (freq * h * (1.0 + stiffness * h * h).sqrt(), amp))
        .filter(|&(f, _)| f < nyquist)
        .collect();

    let envelope = adsr(n, sr, 0.01, 0.1, 0.7, 0.3);
    (0..n)
        .map(|i| {
            let t = time(i, sr);
            let sum: f64 = partials.iter().map(|&(f, amp)| amp * (2.0 * PI * f * t).sin()).sum();
            sum as f32 * envelope[i]
        })
        .collect()
}

fn ambient(sr: u32, freq: f64, duration: f64) -> Vec<f32> {
    let n = frames(duration, sr);
    let mut signal: Vec<f32> = (0..n)
        .map(|i| (2.0 * PI * freq * time(i, sr)).sin() as f32)
        .collect();
    fade(&mut signal, n / 4, n / 3);
    signal
}

const WOBBLE_CHUNK: usize = 1024;
const WOBBLE_MIN_CUTOFF: f64 = 200.0;
const WOBBLE_MAX_CUTOFF: f64 = 8000.0;

/// LFO-swept lowpass over a distorted oscillator stack, with a resonant
/// peak riding the cutoff and a clean sub octave underneath
fn wobble(sr: u32, freq: f64, duration: f64, variation: f64, rng: &mut Pcg32) -> Vec<f32> {
    let n = frames(duration, sr);
    let rate = 4.0 + jitter(rng, 2.0, variation);
    let depth = 0.9;
    let distortion = 0.7;
    let sub_mix = 0.6;

    let raw: Vec<f32> = (0..n)
        .map(|i| {
            let t = time(i, sr);
            let x = (2.0 * PI * freq * t).sin() + 0.5 * saw(freq * t) + 0.3 * square(freq * 1.5 * t);
            (x * (1.0 + distortion * 3.0)).tanh() as f32
        })
        .collect();

    let cutoff: Vec<f64> = (0..n)
        .map(|i| {
            let lfo = (2.0 * PI * rate * time(i, sr)).sin();
            WOBBLE_MIN_CUTOFF + (WOBBLE_MAX_CUTOFF - WOBBLE_MIN_CUTOFF) * (0.5 + 0.5 * lfo * depth)
        })
        .collect();

    let mut filtered = Vec::with_capacity(n);
    for (chunk, cutoffs) in raw.chunks(WOBBLE_CHUNK).zip(cutoff.chunks(WOBBLE_CHUNK)) {
        let avg = cutoffs.iter().sum::<f64>() / cutoffs.len() as f64;
        let swept = filtfilt(&butterworth_lowpass(4, avg, sr), chunk);
        let mut resonant = swept.clone();
        Biquad::peaking(sr, avg, 12.0, 8.0).process(&mut resonant);
        filtered.extend(swept.iter().zip(&resonant).map(|(d, r)| d * 0.7 + r * 0.3));
    }

    let envelope = adsr(n, sr, 0.01, 0.1, 0.8, 0.15);
    (0..n)
        .map(|i| {
            let sub = (PI * freq * time(i, sr)).sin() as f32;
            (filtered[i] * (1.0 - sub_mix) + sub * sub_mix) * envelope[i]
        })
        .collect()
}
