// Compile cache. Keyed on a plan's structural hash plus the currently
// resolved tool fingerprint, so a cached command is never served back
// after the host's toolset changes (e.g. a `SHELLSPARK_SORT` override
// flips mid-process, or `ToolRegistry::clear()` forces rediscovery).
//
// Bounded per spec §4.5 ("a bounded cache"): once `max_entries` is
// reached, the oldest entry by insertion order is evicted before the
// new one lands, mirroring the teacher's `evict_cold_entries` style
// (`DashMap::retain`/`remove` driven by a tracked recency marker)
// rather than letting the map grow without limit.

use crate::error::Result;
use crate::registry::Fingerprint;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

type CacheKey = (u64, Vec<u8>);

/// Default bound on the number of distinct `(plan_hash, fingerprint)`
/// entries retained at once.
const DEFAULT_MAX_ENTRIES: usize = 4096;

struct Entry {
    command: String,
    seq: u64,
}

/// Concurrent, bounded compiled-command cache, shared across threads
/// without an external lock — mirrors the teacher's `DashMap`-backed
/// result caches.
pub struct CompileCache {
    entries: DashMap<CacheKey, Entry>,
    max_entries: usize,
    next_seq: AtomicU64,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Build a cache bounded to at most `max_entries` distinct keys.
    pub fn with_capacity(max_entries: usize) -> Self {
        CompileCache {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Return the cached command for `(plan_hash, fingerprint)`, computing
    /// and storing it via `compute` on a miss. A miss that would push the
    /// cache over `max_entries` first evicts the oldest surviving entry.
    pub fn get_or_compile<F>(&self, plan_hash: u64, fingerprint: &Fingerprint, compute: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        let key = (plan_hash, fingerprint.as_bytes().to_vec());
        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.command.clone());
        }
        let command = compute()?;
        self.evict_if_full();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key, Entry { command: command.clone(), seq });
        Ok(command)
    }

    /// Evict the oldest entry (by insertion sequence) once the cache is
    /// at capacity. Not a strict LRU — a cache hit never bumps an
    /// entry's `seq` — but it bounds memory with the same O(n) scan
    /// cost the teacher's `retain`-based eviction already pays.
    fn evict_if_full(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        let oldest = self.entries.iter().min_by_key(|e| e.value().seq).map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CompileCache {
    fn default() -> Self {
        CompileCache::new()
    }
}
