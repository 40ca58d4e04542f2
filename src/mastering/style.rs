//! Per-style parameter table

use crate::types::MasteringStyle;

/// Multipliers for the six balance bands: sub-bass, bass, low-mid, mid,
/// high-mid, high
pub type BandGains = [f64; 6];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallelSettings {
    /// Linear envelope threshold
    pub threshold: f64,
    pub ratio: f64,
    /// Wet share of the blend
    pub mix: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleSettings {
    pub eq_gains: BandGains,
    pub saturation: f64,
    pub parallel: ParallelSettings,
}

impl StyleSettings {
    pub fn for_style(style: MasteringStyle) -> Self {
        let eq_gains = match style {
            MasteringStyle::Warm => [1.0, 1.05, 0.98, 0.95, 1.02, 0.92],
            MasteringStyle::Balanced => [0.98, 1.02, 1.0, 1.0, 1.03, 1.02],
            MasteringStyle::Bright => [0.95, 0.98, 0.98, 1.02, 1.08, 1.12],
            MasteringStyle::Aggressive => [1.05, 1.08, 1.0, 0.95, 1.10, 1.08],
        };

        let saturation = match style {
            MasteringStyle::Warm => 0.4,
            MasteringStyle::Balanced => 0.2,
            MasteringStyle::Bright => 0.15,
            MasteringStyle::Aggressive => 0.5,
        };

        let (threshold, ratio, mix) = match style {
            MasteringStyle::Aggressive => (0.3, 8.0, 0.4),
            MasteringStyle::Warm => (0.5, 4.0, 0.25),
            MasteringStyle::Balanced | MasteringStyle::Bright => (0.4, 6.0, 0.3),
        };

        Self {
            eq_gains,
            saturation,
            parallel: ParallelSettings { threshold, ratio, mix },
        }
    }
}
