//! Six-pass mastering chain: corrective EQ, dynamics, color, stereo,
//! loudness/limiting, polish

pub mod color;
pub mod corrective;
pub mod dynamics;
pub mod limiter;
pub mod polish;
pub mod stereo;
pub mod style;

use tracing::{debug, info};

use crate::dsp::level::{linear_to_db, peak_abs_planes};
use crate::error::Result;
use crate::types::{AudioBuffer, MasteringStyle};

pub use limiter::{Limiter, CEILING};
pub use style::StyleSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteringOptions {
    pub target_lufs: f64,
    pub style: MasteringStyle,
    pub apply_saturation: bool,
    pub enhance_stereo: bool,
    /// Export depth the dither is sized for (16, 24, or 32 for float)
    pub bit_depth: u16,
    pub dither_seed: u64,
}

impl Default for MasteringOptions {
    fn default() -> Self {
        Self {
            target_lufs: -11.0,
            style: MasteringStyle::Balanced,
            apply_saturation: true,
            enhance_stereo: true,
            bit_depth: 24,
            dither_seed: 0x5EED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MasteringChain {
    options: MasteringOptions,
    settings: StyleSettings,
    limiter: Limiter,
}

impl MasteringChain {
    pub fn new(options: MasteringOptions) -> Self {
        Self {
            settings: StyleSettings::for_style(options.style),
            limiter: Limiter::default(),
            options,
        }
    }

    pub fn options(&self) -> &MasteringOptions {
        &self.options
    }

    /// Run all six passes and return a new mastered buffer. Channel count
    /// and length are preserved.
    pub fn master(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        input.validate_non_empty()?;
        // Reject an unsupported export depth before doing any work
        polish::lsb(self.options.bit_depth)?;

        let mut buffer = input.clone();
        info!(
            "Mastering {:.2}s ({} style, target {:.1} LUFS)",
            buffer.duration_secs(),
            self.options.style,
            self.options.target_lufs
        );

        debug!("Pass 1: corrective EQ & cleanup");
        corrective::multiband_eq(&mut buffer, &self.settings.eq_gains);
        corrective::remove_dc_offset(&mut buffer);
        corrective::tame_resonances(&mut buffer);

        debug!("Pass 2: dynamics");
        dynamics::multiband_compression(&mut buffer);
        dynamics::parallel_compression(&mut buffer, &self.settings.parallel);

        if self.options.apply_saturation {
            debug!("Pass 3: saturation (amount {})", self.settings.saturation);
            color::analog_saturation(&mut buffer, self.settings.saturation);
        }

        if self.options.enhance_stereo {
            debug!("Pass 4: stereo enhancement");
            stereo::enhance_stereo(&mut buffer, stereo::DEFAULT_WIDTH_AMOUNT);
        }

        debug!("Pass 5: loudness & limiting");
        limiter::loudness_maximize(&mut buffer, self.options.target_lufs, &self.limiter);

        debug!("Pass 6: polish & dither");
        polish::air(&mut buffer, &self.limiter);
        polish::dither(&mut buffer, self.options.bit_depth, self.options.dither_seed)?;

        info!(
            "Mastering complete, peak {:.2} dBFS",
            linear_to_db(peak_abs_planes(&buffer.samples))
        );
        Ok(buffer)
    }
}

/// Master with default export settings
pub fn master(
    buffer: &AudioBuffer,
    target_lufs: f64,
    style: MasteringStyle,
    apply_saturation: bool,
    enhance_stereo: bool,
) -> Result<AudioBuffer> {
    MasteringChain::new(MasteringOptions {
        target_lufs,
        style,
        apply_saturation,
        enhance_stereo,
        ..MasteringOptions::default()
    })
    .master(buffer)
}
