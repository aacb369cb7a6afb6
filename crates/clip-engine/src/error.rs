//! Error taxonomy for decode and cursor-open operations.
//!
//! All validation happens up front: pulling from a successfully opened cursor
//! never fails.

use thiserror::Error;

/// Errors surfaced by the decode step and by cursor construction.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The source could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// No registered container/codec recognized the bytes, or the stream is
    /// missing parameters required for decoding (sample rate, channel layout).
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The stream ended mid-frame, or before any audio frame was decoded.
    #[error("truncated stream")]
    Truncated,

    /// Frame headers or checksums were invalid.
    #[error("corrupt stream: {0}")]
    Corrupt(String),

    /// A caller-supplied parameter was out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
