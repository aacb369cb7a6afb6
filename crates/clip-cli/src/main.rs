//! `clip-cli` — decode an audio file, resample it, and write raw PCM.
//!
//! Output is interleaved little-endian `f32`, one chunk at a time, suitable
//! for e.g. `ffplay -f f32le -ar <rate> -i out.f32`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clip_engine::cache::global_cache;
use clip_engine::config::ResampleConfig;
use clip_engine::resample::ChunkCursor;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clip-cli", version)]
struct Args {
    /// Input audio file (any format Symphonia recognizes).
    input: PathBuf,

    /// Target sample rate in Hz.
    #[arg(long, default_value_t = ResampleConfig::default().target_rate)]
    rate: u32,

    /// Chunk size in frames.
    #[arg(long, default_value_t = ResampleConfig::default().chunk_frames)]
    chunk: usize,

    /// Output path for raw interleaved little-endian f32 samples.
    #[arg(long, default_value = "out.f32")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let pcm = global_cache()
        .get_or_decode_path(&args.input)
        .with_context(|| format!("decode {:?}", args.input))?;

    tracing::info!(
        rate_hz = pcm.sample_rate(),
        channels = pcm.channels(),
        frames = pcm.frames(),
        codec = ?pcm.info().codec,
        bit_depth = ?pcm.info().bit_depth,
        "decoded"
    );

    let mut cursor = ChunkCursor::open(pcm, args.rate, args.chunk)?;

    let out = File::create(&args.out).with_context(|| format!("create {:?}", args.out))?;
    let mut out = BufWriter::new(out);

    let mut written_frames: u64 = 0;
    loop {
        let chunk = cursor.pull();
        for sample in &chunk.samples {
            out.write_all(&sample.to_le_bytes())?;
        }
        written_frames += chunk.frames as u64;
        if chunk.is_done {
            break;
        }
    }
    out.flush()?;

    tracing::info!(
        frames = written_frames,
        rate_hz = args.rate,
        out = %args.out.display(),
        "wrote resampled pcm"
    );

    Ok(())
}
