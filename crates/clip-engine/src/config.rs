/// Resampling parameters shared by cursor-opening call sites.
#[derive(Clone, Copy, Debug)]
pub struct ResampleConfig {
    /// Output sample rate in Hz.
    pub target_rate: u32,
    /// Cursor chunk size in frames.
    pub chunk_frames: usize,
}

impl Default for ResampleConfig {
    /// Defaults matching common embedding hosts: CD rate, 1024-frame chunks.
    fn default() -> Self {
        Self {
            target_rate: 44_100,
            chunk_frames: 1024,
        }
    }
}
