//! End-to-end decode → resample pipeline tests over a synthesized WAV file.

use std::io::Write;
use std::sync::Arc;

use clip_engine::cache::{ClipCache, ClipKey};
use clip_engine::decode;
use clip_engine::resample::ChunkCursor;

/// One second of 2-channel 44.1 kHz 16-bit WAV.
fn one_second_stereo_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut bytes);
        let mut writer = hound::WavWriter::new(cursor, spec).unwrap();
        for f in 0..44_100i32 {
            writer.write_sample((f % 1000) as i16).unwrap();
            writer.write_sample(-(f % 1000) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

#[test]
fn decode_then_downsample_chunk_accounting() {
    let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
    file.write_all(&one_second_stereo_wav()).unwrap();
    file.flush().unwrap();

    let pcm = Arc::new(decode::decode_path(file.path()).unwrap());
    assert_eq!(pcm.sample_rate(), 44_100);
    assert_eq!(pcm.channels(), 2);
    assert_eq!(pcm.frames(), 44_100);

    let mut cursor = ChunkCursor::open(pcm, 22_050, 512).unwrap();
    assert_eq!(cursor.total_output_frames(), 22_050);

    let mut chunks = 0;
    let mut frames = 0;
    let mut last = 0;
    loop {
        let chunk = cursor.pull();
        chunks += 1;
        frames += chunk.frames;
        last = chunk.frames;
        if chunk.is_done {
            break;
        }
        assert_eq!(chunk.frames, 512, "only the final chunk may be short");
    }

    assert_eq!(chunks, 44); // ceil(22050 / 512)
    assert_eq!(last, 22_050 % 512);
    assert_eq!(frames, 22_050);
}

#[test]
fn cached_decode_reuses_the_store() {
    let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
    file.write_all(&one_second_stereo_wav()).unwrap();
    file.flush().unwrap();

    let cache = ClipCache::new();
    let first = cache.get_or_decode_path(file.path()).unwrap();
    let second = cache.get_or_decode_path(file.path()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // Handed-out stores survive invalidation.
    cache.clear();
    let mut cursor = ChunkCursor::open(first, 48_000, 1024).unwrap();
    let chunk = cursor.pull();
    assert_eq!(chunk.frames, 1024);

    let third = cache.get_or_decode_path(file.path()).unwrap();
    assert!(!Arc::ptr_eq(&second, &third));
}

#[test]
fn bytes_and_path_share_decode_output() {
    let bytes = one_second_stereo_wav();

    let cache = ClipCache::new();
    let from_bytes = cache.get_or_decode_bytes(&bytes).unwrap();
    assert_eq!(from_bytes.frames(), 44_100);

    // Same content, same key, same store.
    let again = cache.get_or_decode_bytes(&bytes).unwrap();
    assert!(Arc::ptr_eq(&from_bytes, &again));
    assert_eq!(ClipKey::for_bytes(&bytes), ClipKey::for_bytes(&bytes));
}
