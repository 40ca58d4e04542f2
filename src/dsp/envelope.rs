//! Envelope following

/// One-pole smoothing coefficient for a time constant in milliseconds
pub fn time_constant_coef(time_ms: f64, sample_rate: u32) -> f64 {
    let samples = time_ms * sample_rate as f64 / 1000.0;
    if samples <= 0.0 || !samples.is_finite() {
        return 0.0;
    }
    (-1.0 / samples).exp()
}

/// Per-sample one-pole smoother of `|x|` with asymmetric time constants:
/// rising input follows `attack_ms`, falling input follows `release_ms`.
pub fn envelope_follower(samples: &[f32], attack_ms: f64, release_ms: f64, sample_rate: u32) -> Vec<f32> {
    let attack = time_constant_coef(attack_ms, sample_rate);
    let release = time_constant_coef(release_ms, sample_rate);

    let mut envelope = 0.0_f64;
    samples
        .iter()
        .map(|&s| {
            let level = (s as f64).abs();
            let coef = if level > envelope { attack } else { release };
            envelope = coef * envelope + (1.0 - coef) * level;
            envelope as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follower_rises_fast_and_falls_slow() {
        let sr = 48_000;
        let mut input = vec![1.0_f32; 4800];
        input.extend(vec![0.0_f32; 4800]);

        let env = envelope_follower(&input, 1.0, 100.0, sr);

        // 1 ms attack: after 10 ms the envelope is essentially at the input
        assert!(env[479] > 0.99);
        // 100 ms release: 10 ms after the drop it has barely moved
        assert!(env[4800 + 479] > 0.85);
        assert!(env.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn zero_time_constant_tracks_input() {
        let env = envelope_follower(&[0.5, -0.25, 0.0], 0.0, 0.0, 44_100);
        assert_eq!(env, vec![0.5, 0.25, 0.0]);
    }
}
