//! Bounded transcript cache with LRU eviction and per-entry TTL.
//!
//! The cache is shared by every request handler, so the whole structure
//! sits behind one mutex: a `get` that counts a hit and moves the key to
//! the most-recently-used position is a single atomic unit. TTL is checked lazily on access; there is no
//! sweeper thread, so an expired entry lingers in memory until the next
//! access or an LRU eviction removes it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use tubesage_types::transcript::{CacheStats, TranscriptDoc, VideoId};

struct CacheEntry {
    doc: Arc<TranscriptDoc>,
    /// TTL runs from insertion; a hit does not extend an entry's life.
    inserted_at: Instant,
    last_access: Instant,
    /// Rough memory footprint of the cached text, for eviction logs.
    size_bytes: usize,
}

struct CacheInner {
    entries: HashMap<VideoId, CacheEntry>,
    /// Recency order: least-recently-used at the front, MRU at the back.
    /// Total order -- every cached key appears exactly once.
    recency: VecDeque<VideoId>,
    hits: u64,
    misses: u64,
}

impl CacheInner {
    fn mark_used(&mut self, key: &VideoId) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push_back(key.clone());
    }

    fn evict(&mut self, key: &VideoId) {
        self.entries.remove(key);
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
    }
}

/// Bounded key -> transcript store with LRU eviction and lazy TTL expiry.
pub struct TranscriptCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
}

impl TranscriptCache {
    /// Create a cache holding at most `capacity` entries, each servable
    /// for `ttl` after insertion.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
            capacity,
            ttl,
        }
    }

    /// Look up a transcript. Expired entries are removed and counted as
    /// misses even though they were structurally present. A hit refreshes
    /// the recency position atomically with the read.
    pub fn get(&self, video_id: &VideoId) -> Option<Arc<TranscriptDoc>> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        let Some(entry) = inner.entries.get_mut(video_id) else {
            inner.misses += 1;
            return None;
        };

        if entry.inserted_at.elapsed() > self.ttl {
            inner.evict(video_id);
            inner.misses += 1;
            debug!(video_id = %video_id, "cache TTL expired");
            return None;
        }

        entry.last_access = Instant::now();
        let doc = Arc::clone(&entry.doc);
        inner.mark_used(video_id);
        inner.hits += 1;
        debug!(video_id = %video_id, "cache hit");
        Some(doc)
    }

    /// Insert or overwrite a transcript. Overwriting refreshes both
    /// timestamps and the recency position without evicting anything;
    /// a new key at capacity evicts the least-recently-used entry first.
    pub fn put(&self, video_id: VideoId, doc: TranscriptDoc) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let now = Instant::now();

        if !inner.entries.contains_key(&video_id) && inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.recency.front().cloned() {
                if let Some(victim) = inner.entries.get(&oldest) {
                    debug!(
                        video_id = %oldest,
                        idle_secs = victim.last_access.elapsed().as_secs(),
                        bytes = victim.size_bytes,
                        "cache LRU eviction"
                    );
                }
                inner.evict(&oldest);
            }
        }

        let size_bytes = doc.text.len();
        inner.entries.insert(
            video_id.clone(),
            CacheEntry {
                doc: Arc::new(doc),
                inserted_at: now,
                last_access: now,
                size_bytes,
            },
        );
        inner.mark_used(&video_id);
        debug!(video_id = %video_id, "cache set");
    }

    /// Number of entries currently held (including not-yet-collected
    /// expired ones).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and reset nothing but the contents; hit/miss
    /// counters survive a clear.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.clear();
        inner.recency.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &VideoId) -> TranscriptDoc {
        TranscriptDoc {
            video_id: id.clone(),
            text: format!("transcript for {id}"),
            language: "en".to_string(),
            truncated: false,
            chunks: vec![format!("transcript for {id}")],
            char_count: 20,
        }
    }

    fn vid(c: char) -> VideoId {
        VideoId::new(c.to_string().repeat(11)).unwrap()
    }

    fn day() -> Duration {
        Duration::from_secs(24 * 3600)
    }

    #[test]
    fn test_get_miss_on_absent_key() {
        let cache = TranscriptCache::new(2, day());
        assert!(cache.get(&vid('a')).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = TranscriptCache::new(2, day());
        let (a, b, c) = (vid('a'), vid('b'), vid('c'));
        cache.put(a.clone(), doc(&a));
        cache.put(b.clone(), doc(&b));
        cache.put(c.clone(), doc(&c));

        assert!(cache.get(&a).is_none(), "oldest entry should be evicted");
        assert!(cache.get(&b).is_some());
        assert!(cache.get(&c).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_recency_refresh_on_read() {
        let cache = TranscriptCache::new(2, day());
        let (a, b, c) = (vid('a'), vid('b'), vid('c'));
        cache.put(a.clone(), doc(&a));
        cache.put(b.clone(), doc(&b));

        // Reading A makes B the least recently used
        assert!(cache.get(&a).is_some());
        cache.put(c.clone(), doc(&c));

        assert!(cache.get(&b).is_none(), "B should have been evicted");
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn test_overwrite_refreshes_without_eviction() {
        let cache = TranscriptCache::new(2, day());
        let (a, b) = (vid('a'), vid('b'));
        cache.put(a.clone(), doc(&a));
        cache.put(b.clone(), doc(&b));

        // Re-putting A must not evict anything
        cache.put(a.clone(), doc(&a));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn test_ttl_expiry_counts_miss_and_shrinks() {
        let cache = TranscriptCache::new(2, Duration::from_millis(30));
        let a = vid('a');
        cache.put(a.clone(), doc(&a));
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(60));

        assert!(cache.get(&a).is_none(), "expired entry must not be served");
        assert_eq!(cache.len(), 0, "expired entry is removed on access");
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_ttl_runs_from_insertion_not_access() {
        let cache = TranscriptCache::new(2, Duration::from_millis(80));
        let a = vid('a');
        cache.put(a.clone(), doc(&a));

        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get(&a).is_some(), "still within the TTL");

        // The hit refreshed last-access but must not extend the TTL
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get(&a).is_none(), "expired despite the recent access");
    }

    #[test]
    fn test_stats_counts() {
        let cache = TranscriptCache::new(4, day());
        let a = vid('a');
        cache.put(a.clone(), doc(&a));
        cache.get(&a);
        cache.get(&a);
        cache.get(&vid('z'));

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 66.6).abs() < 1.0);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = TranscriptCache::new(2, day());
        let a = vid('a');
        cache.put(a.clone(), doc(&a));
        cache.get(&a);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_concurrent_access_is_consistent() {
        let cache = Arc::new(TranscriptCache::new(8, day()));
        let mut handles = Vec::new();
        for i in 0..8u8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                let id = vid(char::from(b'a' + i));
                for _ in 0..100 {
                    cache.put(id.clone(), doc(&id));
                    assert!(cache.get(&id).is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
    }
}
