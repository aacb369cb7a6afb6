//! Process-wide decoded-clip cache.
//!
//! The cache deduplicates decode work per source identity. It is purely a
//! performance layer: a missing entry only costs a recompute, it never
//! changes output.
//!
//! ## Design
//! - Keys are canonicalized paths, or SHA-256 digests for in-memory buffers.
//! - A single [`Condvar`] signals slot changes, with an in-flight marker
//!   stored *under the same mutex* as the table to avoid races.
//! - At most one decode runs per key: the thread that installs the in-flight
//!   marker decodes, everyone else waits and receives the same `Arc`.
//! - [`ClipCache::clear`] drops the whole table. An in-flight decode that
//!   finishes afterwards reinserts its result (last-writer-wins), which is
//!   acceptable for an advisory cache.
//! - Failed decodes are never cached; the error propagates unchanged and the
//!   next request retries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, OnceLock};

use sha2::{Digest, Sha256};

use crate::decode;
use crate::error::Result;
use crate::pcm::PcmStore;

/// Source identity used to deduplicate decode work.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClipKey {
    /// Canonicalized filesystem path.
    Path(PathBuf),
    /// SHA-256 digest of an in-memory buffer.
    Content([u8; 32]),
}

impl ClipKey {
    /// Key for a filesystem source.
    ///
    /// Canonicalization falls back to the path as given when it cannot be
    /// resolved (the subsequent decode reports the real I/O failure).
    pub fn for_path(path: &Path) -> Self {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        ClipKey::Path(canonical)
    }

    /// Key for an in-memory source.
    pub fn for_bytes(data: &[u8]) -> Self {
        ClipKey::Content(Sha256::digest(data).into())
    }
}

enum Slot {
    /// A decode for this key is running on some thread.
    InFlight,
    Ready(Arc<PcmStore>),
}

/// Shared decode cache with a one-decode-per-key guarantee.
pub struct ClipCache {
    inner: Mutex<HashMap<ClipKey, Slot>>,
    cv: Condvar,
}

impl ClipCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            cv: Condvar::new(),
        }
    }

    /// Cached store for `path`, decoding it on first use.
    pub fn get_or_decode_path(&self, path: &Path) -> Result<Arc<PcmStore>> {
        self.get_or_decode_with(ClipKey::for_path(path), || decode::decode_path(path))
    }

    /// Cached store for an in-memory buffer, keyed by content hash.
    pub fn get_or_decode_bytes(&self, data: &[u8]) -> Result<Arc<PcmStore>> {
        self.get_or_decode_with(ClipKey::for_bytes(data), || {
            decode::decode_bytes(data.to_vec())
        })
    }

    /// Cached store for `key`, running `decode` on first use.
    ///
    /// Concurrent callers for the same key block until the first decode
    /// completes, then all receive the same store. On failure nothing is
    /// cached and the error propagates to the caller that ran the decode;
    /// waiters retry.
    pub fn get_or_decode_with(
        &self,
        key: ClipKey,
        decode: impl FnOnce() -> Result<PcmStore>,
    ) -> Result<Arc<PcmStore>> {
        let mut table = self.inner.lock().unwrap();
        loop {
            match table.get(&key) {
                Some(Slot::Ready(pcm)) => {
                    tracing::debug!(?key, "clip cache hit");
                    return Ok(pcm.clone());
                }
                Some(Slot::InFlight) => {
                    table = self.cv.wait(table).unwrap();
                }
                None => break,
            }
        }

        tracing::debug!(?key, "clip cache miss");
        table.insert(key.clone(), Slot::InFlight);
        drop(table);

        let result = decode();

        let mut table = self.inner.lock().unwrap();
        let out = match result {
            Ok(pcm) => {
                let pcm = Arc::new(pcm);
                table.insert(key, Slot::Ready(pcm.clone()));
                Ok(pcm)
            }
            Err(e) => {
                // Drop only our own marker; clear() may have raced and a
                // later decode may already own this key.
                if matches!(table.get(&key), Some(Slot::InFlight)) {
                    table.remove(&key);
                }
                Err(e)
            }
        };
        drop(table);
        self.cv.notify_all();
        out
    }

    /// Drop every entry, including in-flight markers.
    ///
    /// Stores already handed out stay valid (`Arc`); only future lookups are
    /// affected.
    pub fn clear(&self) {
        let mut table = self.inner.lock().unwrap();
        table.clear();
        drop(table);
        self.cv.notify_all();
    }

    /// Number of cached entries (best-effort snapshot, counts in-flight too).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClipCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<ClipCache> = OnceLock::new();

/// Process-wide cache instance, initialized on first use.
///
/// Lives for the rest of the process; [`ClipCache::clear`] is the only reset.
pub fn global_cache() -> &'static ClipCache {
    GLOBAL.get_or_init(ClipCache::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::SourceInfo;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn test_store() -> PcmStore {
        PcmStore::new(vec![0.0; 8], 44_100, 2, SourceInfo::default()).unwrap()
    }

    #[test]
    fn concurrent_requests_decode_once() {
        let cache = Arc::new(ClipCache::new());
        let decodes = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let decodes = decodes.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_decode_with(ClipKey::for_bytes(b"same-key"), || {
                            decodes.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(test_store())
                        })
                        .unwrap()
                })
            })
            .collect();

        let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        for store in &stores[1..] {
            assert!(Arc::ptr_eq(&stores[0], store));
        }
    }

    #[test]
    fn clear_forces_fresh_decode() {
        let cache = ClipCache::new();
        let decodes = AtomicUsize::new(0);
        let key = ClipKey::for_bytes(b"clearable");

        let decode = || {
            decodes.fetch_add(1, Ordering::SeqCst);
            Ok(test_store())
        };

        cache.get_or_decode_with(key.clone(), decode).unwrap();
        cache.get_or_decode_with(key.clone(), decode).unwrap();
        assert_eq!(decodes.load(Ordering::SeqCst), 1);

        cache.clear();
        assert!(cache.is_empty());

        cache.get_or_decode_with(key, decode).unwrap();
        assert_eq!(decodes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_decode_is_not_cached() {
        let cache = ClipCache::new();
        let decodes = AtomicUsize::new(0);
        let key = ClipKey::for_bytes(b"flaky");

        let err = cache.get_or_decode_with(key.clone(), || {
            decodes.fetch_add(1, Ordering::SeqCst);
            Err(crate::error::DecodeError::Truncated)
        });
        assert!(err.is_err());
        assert!(cache.is_empty());

        cache
            .get_or_decode_with(key, || {
                decodes.fetch_add(1, Ordering::SeqCst);
                Ok(test_store())
            })
            .unwrap();
        assert_eq!(decodes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn distinct_keys_decode_separately() {
        let cache = ClipCache::new();
        let decodes = AtomicUsize::new(0);

        for key in [ClipKey::for_bytes(b"one"), ClipKey::for_bytes(b"two")] {
            cache
                .get_or_decode_with(key, || {
                    decodes.fetch_add(1, Ordering::SeqCst);
                    Ok(test_store())
                })
                .unwrap();
        }

        assert_eq!(decodes.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn content_keys_are_stable() {
        assert_eq!(ClipKey::for_bytes(b"abc"), ClipKey::for_bytes(b"abc"));
        assert_ne!(ClipKey::for_bytes(b"abc"), ClipKey::for_bytes(b"abd"));
    }

    #[test]
    fn global_cache_is_one_instance() {
        let a = global_cache() as *const ClipCache;
        let b = global_cache() as *const ClipCache;
        assert_eq!(a, b);
    }
}
