//! Fingerprint-keyed disk cache for outbound call de-duplication
//!
//! Layout is one file per fingerprint under the cache root; the file body is
//! the serialized upstream payload and the file modification time is the
//! sole staleness signal. Expiry is lazy: an entry past its TTL is deleted
//! at read time and reported as a miss. A periodic sweep is run at startup
//! for hygiene only; correctness never depends on it, nor on the cache
//! being writable at all. Every storage-layer failure degrades to
//! cache-miss behavior.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::time::Duration;
use tracing::debug;

/// Statistics for cache performance tracking
#[derive(Debug, Default, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub writes: usize,
    pub evictions: usize,
}

impl CacheStats {
    /// Calculate cache hit ratio
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Durable key/value store keyed by content fingerprints.
///
/// Writes are idempotent overwrites: a fingerprint never maps to more than
/// one live entry, and the payload on disk is always the most recent write.
#[derive(Debug)]
pub struct FingerprintCache {
    root: Utf8PathBuf,
    stats: CacheStats,
}

impl FingerprintCache {
    /// Open (and create if needed) a cache rooted at `root`.
    ///
    /// Creation failure is not fatal: the cache simply behaves as empty and
    /// read-only, and every access degrades to a miss.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        if let Err(err) = fs::create_dir_all(&root) {
            debug!("cache root {root} not writable, degrading to pass-through: {err}");
        }
        Self {
            root,
            stats: CacheStats::default(),
        }
    }

    /// Cache statistics for verbose logging
    #[must_use]
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn entry_path(&self, fingerprint: &str) -> Utf8PathBuf {
        self.root.join(format!("{fingerprint}.json"))
    }

    fn entry_age(path: &Utf8Path) -> Option<Duration> {
        let modified = fs::metadata(path).ok()?.modified().ok()?;
        // An mtime in the future counts as just written
        Some(modified.elapsed().unwrap_or_default())
    }

    /// Look up a fingerprint, treating entries at or past `ttl` as misses.
    ///
    /// Expired entries are deleted eagerly. Unreadable or vanished entries
    /// are also misses; the caller re-fetches and overwrites.
    pub fn get(&mut self, fingerprint: &str, ttl: Duration) -> Option<Vec<u8>> {
        let path = self.entry_path(fingerprint);

        let Some(age) = Self::entry_age(&path) else {
            self.stats.misses += 1;
            return None;
        };

        if age >= ttl {
            if fs::remove_file(&path).is_ok() {
                self.stats.evictions += 1;
            }
            self.stats.misses += 1;
            debug!("cache expired: {} (age {:?} >= ttl {:?})", &fingerprint[..8], age, ttl);
            return None;
        }

        match fs::read(&path) {
            Ok(payload) => {
                self.stats.hits += 1;
                debug!("cache hit: {}", &fingerprint[..8]);
                Some(payload)
            }
            Err(err) => {
                let _ = fs::remove_file(&path);
                self.stats.misses += 1;
                debug!("cache entry unreadable, removed: {} ({err})", &fingerprint[..8]);
                None
            }
        }
    }

    /// Write a payload under a fingerprint, overwriting any previous entry.
    ///
    /// Best-effort: storage errors are logged and swallowed so that a
    /// read-only or full disk never breaks request handling. Only successful
    /// upstream responses may be written here; failed calls are never cached.
    pub fn put(&mut self, fingerprint: &str, payload: &[u8]) {
        let path = self.entry_path(fingerprint);
        match fs::write(&path, payload) {
            Ok(()) => {
                self.stats.writes += 1;
                debug!("cache write: {} ({} bytes)", &fingerprint[..8], payload.len());
            }
            Err(err) => {
                debug!("cache write failed for {}: {err}", &fingerprint[..8]);
            }
        }
    }

    /// Remove every entry older than `older_than`. Returns the number of
    /// entries removed. Run at startup for hygiene; expiry correctness is
    /// handled lazily in [`get`](Self::get).
    pub fn sweep(&mut self, older_than: Duration) -> usize {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
                continue;
            };
            if path.extension() != Some("json") {
                continue;
            }
            if let Some(age) = Self::entry_age(&path) {
                if age >= older_than && fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            self.stats.evictions += removed;
            debug!("cache sweep removed {removed} stale entries");
        }
        removed
    }

    /// Log cache statistics at debug level
    pub fn log_stats(&self) {
        if self.stats.hits + self.stats.misses > 0 {
            debug!(
                "cache stats: {} hits, {} misses ({:.1}% hit rate), {} writes, {} evictions",
                self.stats.hits,
                self.stats.misses,
                self.stats.hit_ratio() * 100.0,
                self.stats.writes,
                self.stats.evictions
            );
        }
    }
}
