// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Expiring key-value cache shared by every badge request.
///
/// Two namespaces live in the same store: `data:<username>` holds the
/// computed user statistics as JSON and `render:<username>?<params>` holds
/// final response bodies. The data namespace is canonical; render entries can
/// always be rebuilt from it.
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use bytes::Bytes;
use moka::{Expiry, notification::RemovalCause, sync::Cache};
use serde::Serialize;
use tracing::debug;

use crate::error::Error;

/// Lifetime of every cache entry in both namespaces (one day).
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24,);

/// Default number of entries kept before eviction starts.
pub const DEFAULT_MAX_ENTRIES: usize = 4096;

/// Largest value accepted by [`MemoryCache::set`] unless configured otherwise.
pub const DEFAULT_MAX_ITEM_BYTES: usize = 1024 * 1024;

const DATA_PREFIX: &str = "data:";
const RENDER_PREFIX: &str = "render:";

/// Returns the data-namespace key holding the statistics for `username`.
pub fn data_key(username: &str,) -> String
{
    format!("{DATA_PREFIX}{username}")
}

/// Returns the render-namespace key for a badge variant.
///
/// Every parameter that changes the response body takes part in the key, so
/// two requests share an entry only when their output is identical.
///
/// # Example
///
/// ```
/// use ghbadge::render_key;
///
/// assert_eq!(render_key("octocat", true, false, None,), "render:octocat?s1a0j");
/// assert_eq!(render_key("octocat", true, false, Some("cb",),), "render:octocat?s1a0jcb");
/// ```
pub fn render_key(username: &str, support: bool, analytics: bool, callback: Option<&str,>,) -> String
{
    format!(
        "{RENDER_PREFIX}{username}?s{}a{}j{}",
        u8::from(support,),
        u8::from(analytics,),
        callback.unwrap_or_default()
    )
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize,)]
pub struct CacheStats
{
    /// Lookups that returned a live value.
    pub hits:   u64,
    /// Lookups that found nothing or an expired value.
    pub misses: u64,
    /// Live entries currently stored.
    pub items:  usize,
}

/// Storage contract consumed by the badge handler.
///
/// Implementations are shared between concurrent requests and must not hold
/// locks across calls. A failed [`set`](CacheStore::set) is never fatal to the
/// caller.
pub trait CacheStore: Send + Sync
{
    /// Returns the value stored under `key` when present and not expired.
    fn get(&self, key: &str,) -> Option<Bytes,>;

    /// Stores `value` under `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheWrite`] when the store refuses the value.
    fn set(&self, key: &str, value: Bytes, ttl: Duration,) -> Result<(), Error,>;

    /// Returns hit and miss counters.
    fn stats(&self,) -> CacheStats;

    /// Drops every entry and returns how many live entries were removed.
    fn flush_all(&self,) -> usize;
}

/// Stored value together with the lifetime requested by the writer.
#[derive(Debug, Clone,)]
pub(crate) struct CacheEntry
{
    value: Bytes,
    ttl:   Duration,
}

/// Expires each entry after the `ttl` it was written with.
struct EntryTtl;

impl Expiry<String, CacheEntry,> for EntryTtl
{
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant,) -> Option<Duration,>
    {
        Some(value.ttl,)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration,>,
    ) -> Option<Duration,>
    {
        Some(value.ttl,)
    }
}

/// In-process [`CacheStore`] backed by a bounded moka cache with a per-item
/// size limit.
pub struct MemoryCache
{
    entries:        Cache<String, CacheEntry,>,
    hits:           AtomicU64,
    misses:         AtomicU64,
    max_item_bytes: usize,
}

impl Default for MemoryCache
{
    fn default() -> Self
    {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_ITEM_BYTES,)
    }
}

impl MemoryCache
{
    /// Creates a cache holding at most `max_entries` values of at most
    /// `max_item_bytes` each.
    pub fn new(max_entries: usize, max_item_bytes: usize,) -> Self
    {
        let entries = Cache::builder()
            .max_capacity(max_entries.max(1,) as u64,)
            .expire_after(EntryTtl,)
            .eviction_listener(|key: Arc<String,>, _value, cause| {
                if cause == RemovalCause::Size {
                    debug!("evicting {} from cache", key);
                }
            },)
            .build();

        Self {
            entries,
            hits: AtomicU64::new(0,),
            misses: AtomicU64::new(0,),
            max_item_bytes,
        }
    }
}

impl CacheStore for MemoryCache
{
    fn get(&self, key: &str,) -> Option<Bytes,>
    {
        let live = self.entries.get(key,).map(|entry| entry.value,);

        if live.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed,);
            debug!("cache hit for {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed,);
            debug!("cache miss for {}", key);
        }

        live
    }

    fn set(&self, key: &str, value: Bytes, ttl: Duration,) -> Result<(), Error,>
    {
        if value.len() > self.max_item_bytes {
            return Err(Error::cache_write(
                key,
                format!(
                    "value of {} bytes exceeds the {} byte item limit",
                    value.len(),
                    self.max_item_bytes
                ),
            ),);
        }

        self.entries.insert(key.to_owned(), CacheEntry {
            value, ttl,
        },);

        Ok((),)
    }

    fn stats(&self,) -> CacheStats
    {
        // iteration skips expired entries that are still awaiting removal
        let items = self.entries.iter().count();

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed,),
            misses: self.misses.load(Ordering::Relaxed,),
            items,
        }
    }

    fn flush_all(&self,) -> usize
    {
        let flushed = self.entries.iter().count();
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
        flushed
    }
}

#[cfg(test)]
mod tests
{
    use std::thread;

    use super::*;

    fn bytes(value: &str,) -> Bytes
    {
        Bytes::copy_from_slice(value.as_bytes(),)
    }

    #[test]
    fn set_then_get_returns_value()
    {
        let cache = MemoryCache::default();
        cache.set("data:octocat", bytes("{}",), CACHE_TTL,).expect("set should succeed",);

        assert_eq!(cache.get("data:octocat",), Some(bytes("{}",)));
        assert_eq!(cache.stats(), CacheStats {
            hits: 1, misses: 0, items: 1,
        });
    }

    #[test]
    fn missing_key_counts_as_miss()
    {
        let cache = MemoryCache::default();
        assert!(cache.get("render:nobody?s1a1j",).is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn expired_entries_are_dropped_on_read()
    {
        let cache = MemoryCache::default();
        cache.set("data:octocat", bytes("{}",), Duration::from_millis(20,),).expect("set should succeed",);
        cache.set("data:hubot", bytes("{}",), CACHE_TTL,).expect("set should succeed",);
        thread::sleep(Duration::from_millis(60,),);
        cache.entries.run_pending_tasks();

        assert!(cache.get("data:octocat",).is_none());
        assert!(cache.get("data:hubot",).is_some());
        assert_eq!(cache.stats().items, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn overwrite_restarts_entry_lifetime()
    {
        let cache = MemoryCache::default();
        cache.set("data:octocat", bytes("old",), Duration::from_millis(20,),).expect("first set",);
        cache.set("data:octocat", bytes("new",), CACHE_TTL,).expect("second set",);
        thread::sleep(Duration::from_millis(60,),);
        cache.entries.run_pending_tasks();

        assert_eq!(cache.get("data:octocat",), Some(bytes("new",)));
    }

    #[test]
    fn oversized_values_are_rejected()
    {
        let cache = MemoryCache::new(8, 4,);
        let error = cache.set("render:octocat?s1a1j", bytes("too large",), CACHE_TTL,)
            .expect_err("expected item limit error",);

        match error {
            Error::CacheWrite {
                key, ..
            } => assert_eq!(key, "render:octocat?s1a1j"),
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert_eq!(cache.stats().items, 0);
    }

    #[test]
    fn capacity_bounds_entry_count()
    {
        let cache = MemoryCache::new(2, DEFAULT_MAX_ITEM_BYTES,);
        for key in ["a", "b", "c", "d",] {
            cache.set(key, bytes(key,), CACHE_TTL,).expect("set should succeed",);
        }
        cache.entries.run_pending_tasks();

        assert!(cache.entries.entry_count() <= 2);
        assert!(cache.stats().items <= 2);
    }

    #[test]
    fn flush_all_reports_live_entries_and_keeps_counters()
    {
        let cache = MemoryCache::default();
        cache.set("a", bytes("1",), CACHE_TTL,).expect("set a",);
        cache.set("b", bytes("2",), CACHE_TTL,).expect("set b",);
        cache.set("c", bytes("3",), Duration::from_millis(20,),).expect("set c",);
        thread::sleep(Duration::from_millis(60,),);
        cache.entries.run_pending_tasks();
        let _ = cache.get("a",);

        assert_eq!(cache.flush_all(), 2);
        assert!(cache.get("b",).is_none());

        let stats = cache.stats();
        assert_eq!(stats.items, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn keys_are_namespaced()
    {
        assert_eq!(data_key("octocat",), "data:octocat");
        assert_ne!(render_key("octocat", true, true, None,), render_key("octocat", true, true, Some("cb",),));
        assert_ne!(render_key("octocat", true, false, None,), render_key("octocat", false, true, None,));
        assert_ne!(render_key("octocat", true, true, None,), data_key("octocat",));
    }
}
