//! C ABI for embedding hosts.
//!
//! Handle model (see `include/clip_engine.h`):
//! - every constructor returns an opaque pointer, or null on failure
//! - every handle type has exactly one matching free function
//! - result buffers stay valid until their own [`resample_result_free`],
//!   independent of the clip that produced them
//!
//! Double-free and use-after-free are documented caller violations; they are
//! not runtime-checked across the boundary. Internally everything is owned
//! Rust state boxed out and reclaimed through `Box::from_raw`.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::path::Path;
use std::sync::Arc;

use clip_engine::cache::global_cache;
use clip_engine::pcm::PcmStore;
use clip_engine::resample::ChunkCursor;

/// Result chunk handed across the boundary.
///
/// `buffer` points at `frames * channels` interleaved `f32` samples owned by
/// this struct. A terminal result has `frames == 0` and a null buffer.
#[repr(C)]
pub struct CResampleResult {
    pub channels: usize,
    pub frames: usize,
    pub is_done: bool,
    pub buffer: *mut f32,
}

/// Decode a file into a PCM handle, using the process-wide cache.
///
/// # Safety
/// `path` must be a valid NUL-terminated string. The returned handle must be
/// released with [`pcm_free`] exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pcm_new_from_file(path: *const c_char) -> *mut c_void {
    if path.is_null() {
        return std::ptr::null_mut();
    }

    let path = unsafe { CStr::from_ptr(path) };
    let Ok(path) = path.to_str() else {
        return std::ptr::null_mut();
    };

    match global_cache().get_or_decode_path(Path::new(path)) {
        Ok(pcm) => Box::into_raw(Box::new(pcm)) as *mut c_void,
        Err(e) => {
            tracing::error!(path, error = %e, "pcm_new_from_file failed");
            std::ptr::null_mut()
        }
    }
}

/// Decode an in-memory buffer into a PCM handle, cached by content hash.
///
/// # Safety
/// `data` must point at `size` readable bytes. The returned handle must be
/// released with [`pcm_free`] exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pcm_new_from_data(data: *const u8, size: usize) -> *mut c_void {
    if data.is_null() {
        return std::ptr::null_mut();
    }

    let data = unsafe { std::slice::from_raw_parts(data, size) };

    match global_cache().get_or_decode_bytes(data) {
        Ok(pcm) => Box::into_raw(Box::new(pcm)) as *mut c_void,
        Err(e) => {
            tracing::error!(size, error = %e, "pcm_new_from_data failed");
            std::ptr::null_mut()
        }
    }
}

/// Release a PCM handle. Clips opened from it stay valid (shared ownership).
///
/// # Safety
/// `pcm_ptr` must be null or a handle from `pcm_new_from_*` not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pcm_free(pcm_ptr: *mut c_void) {
    if pcm_ptr.is_null() {
        return;
    }

    unsafe {
        drop(Box::from_raw(pcm_ptr as *mut Arc<PcmStore>));
    }
}

/// Open a chunked resample cursor over a PCM handle.
///
/// Returns null when either parameter is zero or the rate does not fit.
///
/// # Safety
/// `pcm_ptr` must be a live handle from `pcm_new_from_*`. The returned handle
/// must be released with [`audio_clip_free`] exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn audio_clip_new(
    pcm_ptr: *mut c_void,
    target_sample_rate: usize,
    chunk_frames: usize,
) -> *mut c_void {
    if pcm_ptr.is_null() {
        return std::ptr::null_mut();
    }

    let pcm = unsafe { &*(pcm_ptr as *const Arc<PcmStore>) };

    let Ok(target_rate) = u32::try_from(target_sample_rate) else {
        return std::ptr::null_mut();
    };

    match ChunkCursor::open(pcm.clone(), target_rate, chunk_frames) {
        Ok(cursor) => Box::into_raw(Box::new(cursor)) as *mut c_void,
        Err(e) => {
            tracing::error!(target_sample_rate, chunk_frames, error = %e, "audio_clip_new failed");
            std::ptr::null_mut()
        }
    }
}

/// Release a clip handle. Results already pulled from it stay valid.
///
/// # Safety
/// `audio_clip_ptr` must be null or a handle from [`audio_clip_new`] not yet
/// freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn audio_clip_free(audio_clip_ptr: *mut c_void) {
    if audio_clip_ptr.is_null() {
        return;
    }

    unsafe {
        drop(Box::from_raw(audio_clip_ptr as *mut ChunkCursor));
    }
}

/// Pull the next chunk from a clip.
///
/// Past exhaustion this keeps returning results with `frames == 0` and
/// `is_done == true`. Returns null only on a null handle.
///
/// # Safety
/// `audio_clip_ptr` must be a live handle from [`audio_clip_new`], with pulls
/// serialized by the caller. Each returned result must be released with
/// [`resample_result_free`] exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn audio_clip_pull(audio_clip_ptr: *mut c_void) -> *mut CResampleResult {
    if audio_clip_ptr.is_null() {
        return std::ptr::null_mut();
    }

    let cursor = unsafe { &mut *(audio_clip_ptr as *mut ChunkCursor) };
    let chunk = cursor.pull();

    let channels = chunk.channels;
    let frames = chunk.frames;
    let is_done = chunk.is_done;

    let buffer = if chunk.samples.is_empty() {
        std::ptr::null_mut()
    } else {
        Box::into_raw(chunk.samples.into_boxed_slice()) as *mut f32
    };

    Box::into_raw(Box::new(CResampleResult {
        channels,
        frames,
        is_done,
        buffer,
    }))
}

/// Release one pulled result and its sample buffer.
///
/// # Safety
/// `result_ptr` must be null or a pointer from [`audio_clip_pull`] not yet
/// freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resample_result_free(result_ptr: *mut CResampleResult) {
    if result_ptr.is_null() {
        return;
    }

    let result = unsafe { Box::from_raw(result_ptr) };
    if !result.buffer.is_null() {
        let len = result.frames * result.channels;
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                result.buffer,
                len,
            )));
        }
    }
}

/// Invalidate the process-wide decode cache. Open handles stay valid.
#[unsafe(no_mangle)]
pub extern "C" fn clear_cache() {
    global_cache().clear();
}
