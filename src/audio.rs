//! Audio file reading and writing using Symphonia and Hound

use std::fs::File;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::AudioBuffer;

/// Decode an audio file (WAV, FLAC, MP3, OGG...) into a planar buffer
pub fn read_audio_file(path: &Path) -> Result<AudioBuffer> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint for the file type
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;
    let mut audio_buffer = AudioBuffer::new(channels, sample_rate);

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_samples(&mut audio_buffer, decoded)?,
            // Corrupt packets are skipped
            Err(SymphoniaError::DecodeError(e)) => warn!("Skipping undecodable packet: {}", e),
            Err(e) => return Err(e.into()),
        }
    }

    debug!(
        "Decoded {}: {} ch, {} Hz, {:.2}s",
        path.display(),
        audio_buffer.channels,
        audio_buffer.sample_rate,
        audio_buffer.duration_secs()
    );
    Ok(audio_buffer)
}

/// Append decoded samples to the audio buffer
fn append_samples(buffer: &mut AudioBuffer, decoded: AudioBufferRef) -> Result<()> {
    macro_rules! append {
        ($buf:expr, $convert:expr) => {{
            for ch in 0..buffer.channels.min($buf.spec().channels.count()) {
                buffer.samples[ch].extend($buf.chan(ch).iter().map($convert));
            }
        }};
    }

    match decoded {
        AudioBufferRef::F32(buf) => append!(buf, |&s: &f32| s),
        AudioBufferRef::F64(buf) => append!(buf, |&s: &f64| s as f32),
        AudioBufferRef::S16(buf) => append!(buf, |&s: &i16| s as f32 / 32768.0),
        AudioBufferRef::S24(buf) => append!(buf, |s: &symphonia::core::sample::i24| s.inner() as f32 / 8388608.0),
        AudioBufferRef::S32(buf) => append!(buf, |&s: &i32| s as f32 / 2147483648.0),
        AudioBufferRef::U8(buf) => append!(buf, |&s: &u8| (s as f32 - 128.0) / 128.0),
        _ => return Err(Error::Decode("unsupported sample format".to_string())),
    }
    Ok(())
}

/// Write a WAV file: 16/24-bit integer or 32-bit float. The buffer is
/// expected to be dithered and clipped already; integer conversion
/// saturates.
pub fn write_wav_file(buffer: &AudioBuffer, path: &Path, bit_depth: u16) -> Result<()> {
    buffer.validate()?;
    let sample_format = match bit_depth {
        16 | 24 => SampleFormat::Int,
        32 => SampleFormat::Float,
        other => return Err(Error::UnsupportedBitDepth(other)),
    };
    let spec = WavSpec {
        channels: buffer.channels as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: bit_depth,
        sample_format,
    };

    let mut writer = WavWriter::create(path, spec)?;
    let interleaved = buffer.to_interleaved();

    match bit_depth {
        16 => {
            for sample in interleaved {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
            }
        }
        24 => {
            for sample in interleaved {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 8388607.0) as i32)?;
            }
        }
        _ => {
            for sample in interleaved {
                writer.write_sample(sample)?;
            }
        }
    }

    writer.finalize()?;
    debug!("Wrote {} ({}-bit)", path.display(), bit_depth);
    Ok(())
}
