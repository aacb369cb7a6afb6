//! Decoded PCM storage.
//!
//! A [`PcmStore`] owns the fully decoded clip: interleaved `f32` samples plus
//! the stream parameters needed to resample it later. Stores are immutable
//! after creation and shared between the cache and open cursors via `Arc`.

use crate::error::{DecodeError, Result};

/// Best-effort metadata captured while probing the source.
#[derive(Clone, Debug, Default)]
pub struct SourceInfo {
    /// Codec name (best-effort).
    pub codec: Option<String>,
    /// Source bit depth (best-effort).
    pub bit_depth: Option<u16>,
    /// Declared duration in milliseconds, if the container provides it.
    pub duration_ms: Option<u64>,
}

/// Decoded, uncompressed audio.
///
/// ## Data model
/// Samples are stored **interleaved**:
/// `frame0[ch0], frame0[ch1], ..., frame1[ch0], frame1[ch1], ...`
#[derive(Debug)]
pub struct PcmStore {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
    info: SourceInfo,
}

impl PcmStore {
    /// Build a store from interleaved samples.
    ///
    /// Rejects a zero sample rate, zero channels, and a sample buffer that is
    /// not a whole number of frames.
    pub fn new(
        samples: Vec<f32>,
        sample_rate: u32,
        channels: usize,
        info: SourceInfo,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DecodeError::InvalidParameter("sample_rate must be > 0"));
        }
        if channels == 0 {
            return Err(DecodeError::InvalidParameter("channels must be > 0"));
        }
        if samples.len() % channels != 0 {
            return Err(DecodeError::InvalidParameter(
                "sample buffer is not a whole number of frames",
            ));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
            info,
        })
    }

    /// Native sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels in the interleaved sample stream.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Total frame count.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Metadata captured at probe time.
    pub fn info(&self) -> &SourceInfo {
        &self.info
    }
}
