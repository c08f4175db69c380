//! Content-fingerprint TTL cache for expensive extraction and analysis artifacts
//!
//! The key is built from file name + size + modification time + schema
//! version, not from file content. Two different files sharing all four
//! collide; that approximation is accepted in exchange for never hashing
//! whole uploads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_SCHEMA_VERSION: &str = "v1";

/// Identity of an uploaded file as seen by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub name: String,
    pub size: u64,
    pub modified_ms: u64,
}

impl FileStamp {
    pub fn new(name: impl Into<String>, size: u64, modified_ms: u64) -> Self {
        Self {
            name: name.into(),
            size,
            modified_ms,
        }
    }

    pub fn fingerprint(&self, schema_version: &str) -> String {
        format!(
            "{}-{}-{}-{}",
            self.name, self.size, self.modified_ms, schema_version
        )
    }
}

/// Time source, swappable so TTL behavior is testable with a manual clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    timestamp_ms: u64,
    #[allow(dead_code)]
    version: String,
}

/// In-memory keyed store with lazy expiry.
///
/// Expired entries are removed as a side effect of being observed by `get`,
/// never by a background sweep. `len` therefore counts stale entries that
/// have not been probed yet. Growth is bounded by `max_entries`; the entry
/// with the oldest timestamp is dropped when the bound is exceeded.
pub struct TtlCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    ttl_ms: u64,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl_ms: u64, max_entries: usize) -> Self {
        Self::with_clock(ttl_ms, max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_ms: u64, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms,
            max_entries,
            clock,
        }
    }

    /// Stores `data` under the file's fingerprint, silently overwriting.
    pub fn set(&mut self, stamp: &FileStamp, data: T, schema_version: &str) {
        let key = stamp.fingerprint(schema_version);
        let entry = CacheEntry {
            data,
            timestamp_ms: self.clock.now_ms(),
            version: schema_version.to_string(),
        };
        self.entries.insert(key, entry);

        if self.entries.len() > self.max_entries {
            self.evict_oldest();
        }
    }

    /// Returns the cached value, or `None` on miss or expiry. An expired
    /// entry is deleted as a side effect of being observed.
    pub fn get(&mut self, stamp: &FileStamp, schema_version: &str) -> Option<T> {
        let key = stamp.fingerprint(schema_version);
        let now = self.clock.now_ms();

        let expired = match self.entries.get(&key) {
            None => return None,
            Some(entry) => now.saturating_sub(entry.timestamp_ms) > self.ttl_ms,
        };

        if expired {
            self.entries.remove(&key);
            return None;
        }

        self.entries.get(&key).map(|e| e.data.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Current entry count, including stale entries not yet probed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.timestamp_ms)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::Clock;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Manually advanced clock for TTL tests.
    pub struct ManualClock {
        now_ms: AtomicU64,
    }

    impl ManualClock {
        pub fn new(start_ms: u64) -> Self {
            Self {
                now_ms: AtomicU64::new(start_ms),
            }
        }

        pub fn advance(&self, delta_ms: u64) {
            self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.now_ms.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    fn stamp() -> FileStamp {
        FileStamp::new("cv.pdf", 42_000, 1_700_000_000_000)
    }

    #[test]
    fn test_get_after_set_returns_value() {
        let mut cache = TtlCache::new(1000, 16);
        cache.set(&stamp(), "hello".to_string(), DEFAULT_SCHEMA_VERSION);
        assert_eq!(
            cache.get(&stamp(), DEFAULT_SCHEMA_VERSION),
            Some("hello".to_string())
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let clock = Arc::new(ManualClock::new(10_000));
        let mut cache = TtlCache::with_clock(1000, 16, clock.clone());
        cache.set(&stamp(), "hello".to_string(), DEFAULT_SCHEMA_VERSION);

        clock.advance(1001);
        assert_eq!(cache.get(&stamp(), DEFAULT_SCHEMA_VERSION), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_entry_survives_within_ttl() {
        let clock = Arc::new(ManualClock::new(10_000));
        let mut cache = TtlCache::with_clock(1000, 16, clock.clone());
        cache.set(&stamp(), "hello".to_string(), DEFAULT_SCHEMA_VERSION);

        clock.advance(999);
        assert_eq!(
            cache.get(&stamp(), DEFAULT_SCHEMA_VERSION),
            Some("hello".to_string())
        );
    }

    #[test]
    fn test_modified_time_changes_the_key() {
        let mut cache = TtlCache::new(60_000, 16);
        let a = FileStamp::new("cv.pdf", 42_000, 1_700_000_000_000);
        let b = FileStamp::new("cv.pdf", 42_000, 1_700_000_999_000);

        cache.set(&a, "first".to_string(), DEFAULT_SCHEMA_VERSION);
        assert_eq!(cache.get(&b, DEFAULT_SCHEMA_VERSION), None);
        cache.set(&b, "second".to_string(), DEFAULT_SCHEMA_VERSION);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&a, DEFAULT_SCHEMA_VERSION), Some("first".to_string()));
    }

    #[test]
    fn test_schema_version_changes_the_key() {
        let mut cache = TtlCache::new(60_000, 16);
        cache.set(&stamp(), "v1 text".to_string(), "v1");
        assert_eq!(cache.get(&stamp(), "v2"), None);
        cache.set(&stamp(), "v2 text".to_string(), "v2");
        assert_eq!(cache.get(&stamp(), "v1"), Some("v1 text".to_string()));
        assert_eq!(cache.get(&stamp(), "v2"), Some("v2 text".to_string()));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache = TtlCache::new(60_000, 16);
        cache.set(&stamp(), 1u32, "v1");
        cache.set(&stamp(), 2u32, "v2");
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound_evicts_oldest() {
        let clock = Arc::new(ManualClock::new(0));
        let mut cache = TtlCache::with_clock(1_000_000, 2, clock.clone());

        let first = FileStamp::new("a.pdf", 1, 1);
        cache.set(&first, "a".to_string(), "v1");
        clock.advance(10);
        cache.set(&FileStamp::new("b.pdf", 2, 2), "b".to_string(), "v1");
        clock.advance(10);
        cache.set(&FileStamp::new("c.pdf", 3, 3), "c".to_string(), "v1");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&first, "v1"), None);
    }
}
