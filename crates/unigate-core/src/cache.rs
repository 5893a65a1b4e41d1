// ── TTL response cache ──
//
// In-memory, per-connection cache protecting the controller from redundant
// polling. Keys are structured (prefix + qualifier + site) rather than
// concatenated strings, so prefix invalidation matches on the prefix
// component and cannot collide with a longer prefix that merely shares
// leading characters. Entries carry their own timestamp, so value and
// write-time are always set and cleared together.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Composite cache key: `<resource-prefix> / <qualifier> / <site>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub prefix: String,
    pub qualifier: Option<String>,
    pub site: String,
}

impl CacheKey {
    /// Key for a whole resource family within a site.
    pub fn new(prefix: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            qualifier: None,
            site: site.into(),
        }
    }

    /// Narrow the key to a single resource within the family
    /// (e.g. a settings section).
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}_{}_{}", self.prefix, q, self.site),
            None => write!(f, "{}_{}", self.prefix, self.site),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    last_update: Instant,
    /// Entry-level TTL set at write time; falls back to the store default.
    ttl: Option<Duration>,
}

/// TTL-bounded response cache with lazy expiry and prefix invalidation.
///
/// Concurrent reads and writes are safe (`DashMap`); expired entries are
/// reported as misses but not evicted until overwritten or invalidated.
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Fetch a cached value if it is fresher than the effective TTL
    /// (read-side override, else write-side TTL, else the store default).
    pub fn get(&self, key: &CacheKey, ttl_override: Option<Duration>) -> Option<Value> {
        let entry = self.entries.get(key)?;
        let effective_ttl = ttl_override.or(entry.ttl).unwrap_or(self.default_ttl);
        if entry.last_update.elapsed() < effective_ttl {
            debug!(key = %key, "cache hit");
            Some(entry.value.clone())
        } else {
            debug!(key = %key, "cache expired");
            None
        }
    }

    /// Unconditionally overwrite the value and its write timestamp.
    pub fn put(&self, key: CacheKey, value: Value, ttl_override: Option<Duration>) {
        debug!(key = %key, "cache updated");
        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_update: Instant::now(),
                ttl: ttl_override,
            },
        );
    }

    /// Remove every key whose prefix component matches. Matching is on the
    /// structured prefix, not on raw string prefixes, so `"site"` never
    /// catches `"site_settings"` keys.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| key.prefix != prefix);
        debug!(prefix, "cache invalidated by prefix");
    }

    /// Clear the entire store.
    pub fn invalidate_all(&self) {
        self.entries.clear();
        debug!("cache fully invalidated");
    }

    /// Physical presence of a key regardless of freshness (expired entries
    /// linger until overwritten or invalidated).
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of physically present entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> ResponseCache {
        ResponseCache::new(Duration::from_secs(30))
    }

    #[test]
    fn fresh_entry_is_a_hit() {
        let c = cache();
        let key = CacheKey::new("sites", "default");
        c.put(key.clone(), json!([{"name": "default"}]), None);

        assert_eq!(c.get(&key, None), Some(json!([{"name": "default"}])));
    }

    #[test]
    fn expired_entry_is_a_miss_but_stays_present() {
        let c = cache();
        let key = CacheKey::new("sysinfo", "default");
        c.put(key.clone(), json!({"version": "8.0"}), None);

        // Zero TTL: now - last_update < 0 never holds.
        assert_eq!(c.get(&key, Some(Duration::ZERO)), None);
        assert!(c.contains(&key), "lazy expiry must not evict");
    }

    #[test]
    fn read_override_beats_write_ttl() {
        let c = cache();
        let key = CacheKey::new("health", "default");
        c.put(key.clone(), json!({}), Some(Duration::ZERO));

        // Entry-level TTL says expired, but a generous read override wins.
        assert!(c.get(&key, Some(Duration::from_secs(60))).is_some());
        assert!(c.get(&key, None).is_none());
    }

    #[test]
    fn put_overwrites_value_and_timestamp_atomically() {
        let c = cache();
        let key = CacheKey::new("sites", "default");
        c.put(key.clone(), json!(1), None);
        c.put(key.clone(), json!(2), None);

        assert_eq!(c.get(&key, None), Some(json!(2)));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn prefix_invalidation_removes_family_and_nothing_else() {
        let c = cache();
        c.put(CacheKey::new("sites", "default"), json!(1), None);
        c.put(
            CacheKey::new("sites", "branch").with_qualifier("detail"),
            json!(2),
            None,
        );
        c.put(CacheKey::new("sysinfo", "default"), json!(3), None);
        // Shares leading characters with "sites" but is a distinct prefix.
        c.put(CacheKey::new("sites_archive", "default"), json!(4), None);

        c.invalidate_prefix("sites");

        assert!(!c.contains(&CacheKey::new("sites", "default")));
        assert!(c.contains(&CacheKey::new("sysinfo", "default")));
        assert!(c.contains(&CacheKey::new("sites_archive", "default")));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn invalidate_all_empties_the_store() {
        let c = cache();
        c.put(CacheKey::new("sites", "default"), json!(1), None);
        c.put(CacheKey::new("health", "default"), json!(2), None);

        c.invalidate_all();
        assert!(c.is_empty());
    }

    #[test]
    fn same_prefix_different_site_is_a_distinct_key() {
        let c = cache();
        c.put(CacheKey::new("sites", "default"), json!("a"), None);
        c.put(CacheKey::new("sites", "branch"), json!("b"), None);

        assert_eq!(c.get(&CacheKey::new("sites", "branch"), None), Some(json!("b")));
        assert_eq!(c.len(), 2);
    }
}
