//! Pipeline configuration: defaults with environment overrides

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::types::DEFAULT_SAMPLE_RATE;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sample_rate: u32,
    pub max_regeneration_attempts: usize,
    pub target_lufs: f64,
    pub humanize: bool,
    pub master: bool,
    pub quality_control: bool,
    pub apply_saturation: bool,
    pub enhance_stereo: bool,
    pub export_bit_depth: u16,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_regeneration_attempts: 5,
            target_lufs: -11.0,
            humanize: true,
            master: true,
            quality_control: true,
            apply_saturation: true,
            enhance_stereo: true,
            export_bit_depth: 24,
            seed: 0x5EED,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `DJ_*` environment variables. Unparsable values
    /// keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sample_rate: env_or("DJ_SAMPLE_RATE", defaults.sample_rate),
            max_regeneration_attempts: env_or("DJ_MAX_ATTEMPTS", defaults.max_regeneration_attempts),
            target_lufs: env_or("DJ_TARGET_LUFS", defaults.target_lufs),
            humanize: env_flag("DJ_HUMANIZE", defaults.humanize),
            master: env_flag("DJ_MASTER", defaults.master),
            quality_control: env_flag("DJ_QUALITY_CONTROL", defaults.quality_control),
            export_bit_depth: env_or("DJ_BIT_DEPTH", defaults.export_bit_depth),
            seed: env_or("DJ_SEED", defaults.seed),
            ..defaults
        }
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("Ignoring invalid {}={:?}, using default", key, raw);
        default
    })
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => parse_flag(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_flag(key: &str, raw: &str, default: bool) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate, 96_000);
        assert_eq!(config.max_regeneration_attempts, 5);
        assert_eq!(config.export_bit_depth, 24);
    }

    #[test]
    fn parsing_falls_back_on_garbage() {
        assert_eq!(parse_or("DJ_SEED", " 42 ", 7_u64), 42);
        assert_eq!(parse_or("DJ_SEED", "forty", 7_u64), 7);
        assert_eq!(parse_or("DJ_TARGET_LUFS", "-14.5", -11.0), -14.5);
        assert!(!parse_flag("DJ_MASTER", "off", true));
        assert!(parse_flag("DJ_MASTER", "Yes", false));
        assert!(parse_flag("DJ_MASTER", "maybe", true));
    }
}
