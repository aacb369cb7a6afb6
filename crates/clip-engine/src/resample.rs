//! Chunked resample stage.
//!
//! Converts a [`PcmStore`] at its native rate into fixed-size chunks at a
//! caller-chosen target rate. The cursor carries its source position across
//! pulls, so draining it chunk by chunk produces bit-for-bit the same samples
//! as resampling the whole clip in one pass and slicing the result.
//!
//! The source position is kept as an exact rational: an integer frame index
//! plus a fractional numerator over `target_rate`. Each output frame advances
//! the position by `source_rate / target_rate`. Output samples are two-point
//! linear interpolations of the neighboring source frames; when the rates
//! match, every position lands on a whole source frame and the input is
//! reproduced exactly.

use std::sync::Arc;

use crate::error::{DecodeError, Result};
use crate::pcm::PcmStore;

/// One pull's worth of resampled output.
///
/// `frames == chunk_frames` for every chunk except the last; the last chunk
/// carries the remainder, which may be zero. Ownership of the sample buffer
/// transfers to the caller.
pub struct Chunk {
    /// Number of channels in the interleaved sample buffer.
    pub channels: usize,
    /// Frames in this chunk.
    pub frames: usize,
    /// True on and after the chunk that exhausts the source.
    pub is_done: bool,
    /// Interleaved `f32` samples, `frames * channels` long.
    pub samples: Vec<f32>,
}

/// Stateful cursor over one resampling operation.
///
/// Not safe for concurrent pulls; callers serialize access per cursor
/// (pulling takes `&mut self`).
pub struct ChunkCursor {
    pcm: Arc<PcmStore>,
    target_rate: u32,
    chunk_frames: usize,
    /// Integer part of the current source position, in frames.
    src_index: u64,
    /// Fractional part of the source position, as a numerator over `target_rate`.
    frac_num: u64,
    produced: u64,
    total_out: u64,
    done: bool,
}

impl ChunkCursor {
    /// Open a cursor producing `chunk_frames`-sized chunks at `target_rate`.
    ///
    /// Both parameters must be positive; everything else is validated here so
    /// that [`ChunkCursor::pull`] can never fail.
    pub fn open(pcm: Arc<PcmStore>, target_rate: u32, chunk_frames: usize) -> Result<Self> {
        if target_rate == 0 {
            return Err(DecodeError::InvalidParameter("target_rate must be > 0"));
        }
        if chunk_frames == 0 {
            return Err(DecodeError::InvalidParameter("chunk_frames must be > 0"));
        }

        let source_rate = pcm.sample_rate() as u128;
        let total_out = (pcm.frames() as u128 * target_rate as u128)
            .div_ceil(source_rate) as u64;

        tracing::debug!(
            source_rate_hz = pcm.sample_rate(),
            target_rate_hz = target_rate,
            chunk_frames,
            output_frames = total_out,
            "opened cursor"
        );

        Ok(Self {
            pcm,
            target_rate,
            chunk_frames,
            src_index: 0,
            frac_num: 0,
            produced: 0,
            total_out,
            done: false,
        })
    }

    /// Total output frames this cursor will produce across all pulls.
    pub fn total_output_frames(&self) -> u64 {
        self.total_out
    }

    /// Whether the source has been exhausted.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Produce the next chunk.
    ///
    /// Past exhaustion this keeps returning empty terminal chunks; it never
    /// errors and never panics.
    pub fn pull(&mut self) -> Chunk {
        let channels = self.pcm.channels();

        if self.done {
            return Chunk {
                channels,
                frames: 0,
                is_done: true,
                samples: Vec::new(),
            };
        }

        let remaining = self.total_out - self.produced;
        let frames = remaining.min(self.chunk_frames as u64) as usize;

        let src = self.pcm.samples();
        let src_frames = self.pcm.frames();
        let mut samples = vec![0.0f32; frames * channels];

        for f in 0..frames {
            let i = self.src_index as usize;
            let frac = self.frac_num as f32 / self.target_rate as f32;
            let base = i * channels;

            for c in 0..channels {
                let s0 = src[base + c];
                samples[f * channels + c] = if self.frac_num == 0 || i + 1 >= src_frames {
                    s0
                } else {
                    let s1 = src[base + channels + c];
                    s0 + (s1 - s0) * frac
                };
            }

            // Advance by source_rate / target_rate frames.
            self.frac_num += self.pcm.sample_rate() as u64;
            self.src_index += self.frac_num / self.target_rate as u64;
            self.frac_num %= self.target_rate as u64;
        }

        self.produced += frames as u64;
        if self.produced >= self.total_out {
            self.done = true;
        }

        Chunk {
            channels,
            frames,
            is_done: self.done,
            samples,
        }
    }
}
