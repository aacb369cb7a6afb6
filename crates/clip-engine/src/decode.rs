//! Format decode stage.
//!
//! Uses Symphonia to:
//! - probe the input container/codec
//! - decode every packet of the default audio track into interleaved `f32`
//! - collect the result into a [`PcmStore`]
//!
//! Decoding is all-or-nothing: a malformed stream yields an error and no
//! store. It is also pure with respect to process state; cache population is
//! the caller's job (see [`crate::cache`]).

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{DecodeError, Result};
use crate::pcm::{PcmStore, SourceInfo};

/// Decode a file into a [`PcmStore`], hinting the probe with the extension.
pub fn decode_path(path: &Path) -> Result<PcmStore> {
    let file = File::open(path)?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_media_source(Box::new(file), hint)
}

/// Decode an in-memory byte buffer into a [`PcmStore`].
pub fn decode_bytes(data: Vec<u8>) -> Result<PcmStore> {
    decode_media_source(Box::new(Cursor::new(data)), Hint::new())
}

/// Decode an arbitrary Symphonia [`MediaSource`] (seekable or not).
///
/// This is the shared entry point behind both the path and the byte-buffer
/// variants.
fn decode_media_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<PcmStore> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(map_symphonia_error)?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| DecodeError::UnsupportedFormat("no default audio track".to_string()))?;
    let track_id = track.id;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| DecodeError::UnsupportedFormat("unknown channel layout".to_string()))?
        .count();

    let rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnsupportedFormat("unknown sample rate".to_string()))?;

    let codec_params: CodecParameters = track.codec_params.clone();
    let info = SourceInfo {
        codec: codec_name_from_params(&codec_params),
        bit_depth: codec_params
            .bits_per_sample
            .or(codec_params.bits_per_coded_sample)
            .and_then(|v| u16::try_from(v).ok()),
        duration_ms: duration_ms_from_codec_params(&codec_params),
    };

    let samples = decode_format_loop(format.as_mut(), &codec_params, track_id, channels)?;

    // A recognized container that yields no audio frames ended early.
    if samples.is_empty() {
        return Err(DecodeError::Truncated);
    }

    tracing::debug!(
        rate_hz = rate,
        channels,
        frames = samples.len() / channels,
        codec = ?info.codec,
        "decoded source"
    );

    PcmStore::new(samples, rate, channels, info)
}

/// Decode packets from a probed `FormatReader` into interleaved `f32`.
fn decode_format_loop(
    format: &mut dyn FormatReader,
    codec_params: &CodecParameters,
    track_id: u32,
    channels: usize,
) -> Result<Vec<f32>> {
    let mut decoder = symphonia::default::get_codecs()
        .make(codec_params, &DecoderOptions::default())
        .map_err(map_symphonia_error)?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            // Symphonia signals normal EOF as an UnexpectedEof with this
            // exact message; anything else is a real failure.
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof
                    && e.to_string() == "end of stream" =>
            {
                break;
            }
            Err(e) => return Err(map_symphonia_error(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(map_symphonia_error)?;

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.len() % channels != 0 {
        return Err(DecodeError::Truncated);
    }

    Ok(samples)
}

/// Map a Symphonia error onto the crate's taxonomy.
fn map_symphonia_error(err: SymphoniaError) -> DecodeError {
    match err {
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            DecodeError::Truncated
        }
        SymphoniaError::IoError(e) => DecodeError::Io(e),
        SymphoniaError::DecodeError(msg) => DecodeError::Corrupt(msg.to_string()),
        SymphoniaError::Unsupported(what) => DecodeError::UnsupportedFormat(what.to_string()),
        SymphoniaError::LimitError(msg) => DecodeError::Corrupt(msg.to_string()),
        SymphoniaError::SeekError(_) | SymphoniaError::ResetRequired => {
            DecodeError::Corrupt("decoder reset mid-stream".to_string())
        }
    }
}

/// Best-effort duration in milliseconds from codec metadata.
///
/// Returns `None` if the container does not provide total frames or sample rate.
fn duration_ms_from_codec_params(codec_params: &CodecParameters) -> Option<u64> {
    let frames = codec_params.n_frames?;
    let rate = codec_params.sample_rate? as u64;
    if rate == 0 {
        return None;
    }
    Some(frames.saturating_mul(1000) / rate)
}

/// Best-effort codec label for [`SourceInfo`].
fn codec_name_from_params(params: &CodecParameters) -> Option<String> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_AAC => "AAC",
        CODEC_TYPE_ALAC => "ALAC",
        CODEC_TYPE_VORBIS => "VORBIS",
        CODEC_TYPE_OPUS => "OPUS",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => "PCM_S32",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    };
    Some(name.to_string())
}
