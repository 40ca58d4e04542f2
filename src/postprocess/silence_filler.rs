//! Silence filling: crossfade ambient textures into detected gaps

use rand_pcg::Pcg32;
use tracing::debug;

use crate::analysis::SilenceGap;
use crate::types::AudioBuffer;

use super::textures::{ambient_pad, room_tone, vinyl_noise, StereoTexture};

/// Gap filling and ambience layering
pub trait SilenceFiller: Send + Sync {
    /// Replace each listed gap with fill material, crossfaded at the edges
    fn fill_gaps(&self, buffer: &AudioBuffer, gaps: &[SilenceGap], rng: &mut Pcg32) -> AudioBuffer;

    /// Lay a continuous low-level ambience under the whole buffer
    fn add_ambience(&self, buffer: &AudioBuffer, volume: f64, rng: &mut Pcg32) -> AudioBuffer;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStyle {
    /// Pick by gap length: vinyl under 1 s, room tone under 3 s, pad beyond
    Smart,
    Vinyl,
    Room,
    Ambient,
}

impl FillStyle {
    fn resolve(self, gap_seconds: f64) -> Self {
        match self {
            Self::Smart if gap_seconds < 1.0 => Self::Vinyl,
            Self::Smart if gap_seconds < 3.0 => Self::Room,
            Self::Smart => Self::Ambient,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AmbientSilenceFiller {
    pub style: FillStyle,
    pub fill_volume: f64,
}

impl Default for AmbientSilenceFiller {
    fn default() -> Self {
        Self {
            style: FillStyle::Smart,
            fill_volume: 0.35,
        }
    }
}

const MAX_FADE_SECONDS: f64 = 0.1;

impl AmbientSilenceFiller {
    fn texture(&self, style: FillStyle, rng: &mut Pcg32, len: usize, sample_rate: u32) -> StereoTexture {
        match style {
            FillStyle::Vinyl | FillStyle::Smart => vinyl_noise(rng, len, sample_rate),
            FillStyle::Room => room_tone(rng, len, sample_rate),
            FillStyle::Ambient => ambient_pad(rng, len, sample_rate),
        }
    }
}

/// Texture plane for output channel `ch` of a buffer with `channels`
/// channels (mono takes the average of both sides)
fn plane_for(texture: &StereoTexture, ch: usize, channels: usize, i: usize) -> f32 {
    if channels == 1 {
        (texture[0][i] + texture[1][i]) * 0.5
    } else {
        texture[ch.min(1)][i]
    }
}

impl SilenceFiller for AmbientSilenceFiller {
    fn fill_gaps(&self, buffer: &AudioBuffer, gaps: &[SilenceGap], rng: &mut Pcg32) -> AudioBuffer {
        let mut output = buffer.clone();
        let sr = buffer.sample_rate as f64;
        let frames = buffer.frame_count();

        for gap in gaps {
            let start = ((gap.start_seconds * sr) as usize).min(frames);
            let end = (((gap.start_seconds + gap.duration_seconds) * sr) as usize).min(frames);
            let len = end - start;
            if len == 0 {
                continue;
            }

            let style = self.style.resolve(gap.duration_seconds);
            debug!("Filling {:.2}s gap at {:.2}s with {:?}", gap.duration_seconds, gap.start_seconds, style);
            let texture = self.texture(style, rng, len, buffer.sample_rate);
            let fade = (len / 10).min((MAX_FADE_SECONDS * sr) as usize);
            let volume = self.fill_volume as f32;

            for (ch, channel) in output.samples.iter_mut().enumerate() {
                for i in 0..len {
                    let mut fill = plane_for(&texture, ch, buffer.channels, i) * volume;
                    let mut original = 1.0_f32;
                    if fade > 0 && i < fade {
                        let ramp = i as f32 / fade as f32;
                        fill *= ramp;
                        original = 1.0 - ramp;
                    } else if fade > 0 && i >= len - fade {
                        let ramp = (len - 1 - i) as f32 / fade as f32;
                        fill *= ramp;
                        original = 1.0 - ramp;
                    }
                    let s = &mut channel[start + i];
                    *s = *s * original + fill;
                }
            }
        }
        output
    }

    fn add_ambience(&self, buffer: &AudioBuffer, volume: f64, rng: &mut Pcg32) -> AudioBuffer {
        let frames = buffer.frame_count();
        let room = room_tone(rng, frames, buffer.sample_rate);
        let vinyl = vinyl_noise(rng, frames, buffer.sample_rate);
        let layer: StereoTexture = [0, 1].map(|side| {
            room[side]
                .iter()
                .zip(&vinyl[side])
                .map(|(r, v)| ((r * 0.7 + v * 0.3) as f64 * volume) as f32)
                .collect()
        });

        let mut output = buffer.clone();
        for (ch, channel) in output.samples.iter_mut().enumerate() {
            for (i, s) in channel.iter_mut().enumerate() {
                *s += plane_for(&layer, ch, buffer.channels, i);
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metrics::silence;
    use crate::rng::create_rng;

    fn gapped(sr: u32) -> AudioBuffer {
        let mut samples = vec![0.3_f32; sr as usize];
        samples.extend(vec![0.0; 2 * sr as usize]);
        samples.extend(vec![0.3; sr as usize]);
        AudioBuffer::from_stereo(samples.clone(), samples, sr)
    }

    #[test]
    fn smart_style_by_gap_length() {
        assert_eq!(FillStyle::Smart.resolve(0.5), FillStyle::Vinyl);
        assert_eq!(FillStyle::Smart.resolve(2.0), FillStyle::Room);
        assert_eq!(FillStyle::Smart.resolve(5.0), FillStyle::Ambient);
        assert_eq!(FillStyle::Room.resolve(5.0), FillStyle::Room);
    }

    #[test]
    fn filling_shrinks_the_gap() {
        let sr = 8000;
        let buffer = gapped(sr);
        let before = silence(&buffer, 0.3);
        assert_eq!(before.gaps.len(), 1);

        let mut rng = create_rng(9);
        let filled = AmbientSilenceFiller::default().fill_gaps(&buffer, &before.gaps, &mut rng);
        let after = silence(&filled, 0.3);
        assert!(after.longest_seconds < before.longest_seconds);
        assert_eq!(filled.frame_count(), buffer.frame_count());
        // Material outside the gap is untouched
        assert_eq!(filled.samples[0][..sr as usize], buffer.samples[0][..sr as usize]);
    }

    #[test]
    fn ambience_keeps_layout() {
        let buffer = AudioBuffer::silent(1, 8000, 8000);
        let mut rng = create_rng(10);
        let out = AmbientSilenceFiller::default().add_ambience(&buffer, 0.1, &mut rng);
        assert_eq!(out.channels, 1);
        assert_eq!(out.frame_count(), 8000);
        assert!(out.samples[0].iter().any(|&s| s != 0.0));
    }
}
