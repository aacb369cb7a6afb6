//! Chunked audio decode + resample engine.
//!
//! Pipeline: encoded bytes → [`decode`] → [`pcm::PcmStore`] →
//! [`resample::ChunkCursor`] → fixed-size chunks at the target rate.
//! A process-wide [`cache::ClipCache`] deduplicates decode work per source.

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod pcm;
pub mod resample;
