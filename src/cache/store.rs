//! In-memory feed page storage.
//!
//! Pages live in a single LRU map keyed by `FeedKey`. Entries carry an
//! optional deadline; an expired entry reads as a miss and is dropped on the
//! spot, so reads never have to trigger invalidation elsewhere.
//!
//! Readers that fill the cache from storage take a [`FillTicket`] before the
//! storage read and hand it back to [`FeedCache::fill`]. Invalidating a feed
//! bumps its generation, so a fill that raced with a write is discarded
//! instead of caching a page that is already stale.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::application::pagination::Page;
use crate::domain::entities::PostRecord;

use super::config::CacheConfig;
use super::keys::{FeedKey, ScopeKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_HIT: &str = "yatube_feed_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "yatube_feed_cache_miss_total";
pub(crate) const METRIC_EVICT: &str = "yatube_feed_cache_evict_total";
pub(crate) const METRIC_INVALIDATED: &str = "yatube_feed_cache_invalidated_total";

pub type CachedPage = Page<PostRecord>;

#[derive(Clone)]
struct CachedEntry {
    page: CachedPage,
    expires_at: Option<Instant>,
}

impl CachedEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Invalidation state of one feed, captured before reading it from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket {
    epoch: u64,
    generation: u64,
}

struct Pages {
    entries: LruCache<FeedKey, CachedEntry>,
    /// Scopes never invalidated since the last clear are at generation 0.
    generations: HashMap<ScopeKey, u64>,
    epoch: u64,
}

impl Pages {
    fn ticket(&self, scope: &ScopeKey) -> FillTicket {
        FillTicket {
            epoch: self.epoch,
            generation: self.generations.get(scope).copied().unwrap_or_default(),
        }
    }

    fn bump(&mut self, scope: &ScopeKey) {
        *self.generations.entry(scope.clone()).or_default() += 1;
    }

    fn insert(&mut self, key: FeedKey, entry: CachedEntry) {
        let scope = key.scope.kind();
        match self.entries.push(key.clone(), entry) {
            Some((evicted_key, _)) if evicted_key != key => {
                counter!(METRIC_EVICT, "scope" => scope).increment(1);
                debug!(evicted = %evicted_key, "Evicted cached feed page");
            }
            _ => {}
        }
    }
}

/// Shared cache of rendered-ready feed pages.
pub struct FeedCache {
    config: CacheConfig,
    pages: RwLock<Pages>,
}

impl FeedCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            pages: RwLock::new(Pages {
                entries: LruCache::new(config.capacity_non_zero()),
                generations: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// TTL applied by the feed assembler when it stores a page.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.config.default_ttl()
    }

    pub fn get(&self, key: &FeedKey) -> Option<CachedPage> {
        if !self.config.is_enabled() {
            return None;
        }

        let now = Instant::now();
        let mut pages = rw_write(&self.pages, SOURCE, "get");
        let hit = match pages.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.page.clone()),
            Some(_) => {
                pages.entries.pop(key);
                debug!(key = %key, "Cached feed page expired");
                None
            }
            None => None,
        };
        drop(pages);

        let scope = key.scope.kind();
        match hit {
            Some(page) => {
                counter!(METRIC_HIT, "scope" => scope).increment(1);
                Some(page)
            }
            None => {
                counter!(METRIC_MISS, "scope" => scope).increment(1);
                None
            }
        }
    }

    /// Take before reading `scope` from storage; pass to [`FeedCache::fill`].
    pub fn ticket(&self, scope: &ScopeKey) -> FillTicket {
        rw_read(&self.pages, SOURCE, "ticket").ticket(scope)
    }

    /// Store a page; `ttl = None` keeps it until invalidated or evicted.
    pub fn set(&self, key: FeedKey, page: CachedPage, ttl: Option<Duration>) {
        if !self.config.is_enabled() {
            return;
        }

        let entry = CachedEntry {
            page,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        rw_write(&self.pages, SOURCE, "set").insert(key, entry);
    }

    /// Store a page read from storage unless its feed was invalidated since
    /// `ticket` was taken. Returns whether the page was stored.
    pub fn fill(
        &self,
        key: FeedKey,
        page: CachedPage,
        ttl: Option<Duration>,
        ticket: FillTicket,
    ) -> bool {
        if !self.config.is_enabled() {
            return false;
        }

        let mut pages = rw_write(&self.pages, SOURCE, "fill");
        if pages.ticket(&key.scope) != ticket {
            drop(pages);
            debug!(key = %key, "Discarded feed page invalidated during fill");
            return false;
        }

        let entry = CachedEntry {
            page,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        pages.insert(key, entry);
        true
    }

    pub fn invalidate(&self, key: &FeedKey) -> bool {
        let mut pages = rw_write(&self.pages, SOURCE, "invalidate");
        pages.bump(&key.scope);
        let removed = pages.entries.pop(key).is_some();
        drop(pages);

        if removed {
            counter!(METRIC_INVALIDATED, "scope" => key.scope.kind()).increment(1);
        }
        removed
    }

    /// Drop every cached page of one feed; returns how many were removed.
    pub fn invalidate_scope(&self, scope: &ScopeKey) -> usize {
        let mut pages = rw_write(&self.pages, SOURCE, "invalidate_scope");
        pages.bump(scope);
        let doomed: Vec<FeedKey> = pages
            .entries
            .iter()
            .filter(|(key, _)| &key.scope == scope)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            pages.entries.pop(key);
        }
        drop(pages);

        if !doomed.is_empty() {
            counter!(METRIC_INVALIDATED, "scope" => scope.kind()).increment(doomed.len() as u64);
        }
        doomed.len()
    }

    pub fn clear_all(&self) {
        let mut pages = rw_write(&self.pages, SOURCE, "clear_all");
        pages.entries.clear();
        pages.generations.clear();
        pages.epoch += 1;
    }

    pub fn len(&self) -> usize {
        rw_read(&self.pages, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::application::pagination::PageRequest;

    use super::*;

    fn sample_post(text: &str) -> PostRecord {
        PostRecord {
            id: Uuid::now_v7(),
            text: text.to_string(),
            image: None,
            author_id: Uuid::now_v7(),
            author_username: "SteveJ".to_string(),
            author_name: "Steve Jobs".to_string(),
            group_id: None,
            group_slug: None,
            group_title: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn sample_page(text: &str) -> CachedPage {
        Page::new(vec![sample_post(text)], PageRequest::new(1, 10), 1)
    }

    #[test]
    fn set_then_get_returns_page() {
        let cache = FeedCache::new(&CacheConfig::default());
        let key = FeedKey::index(1);
        assert!(cache.get(&key).is_none());

        cache.set(key.clone(), sample_page("cache-cache-cache"), None);

        let cached = cache.get(&key).expect("cached page");
        assert_eq!(cached.items[0].text, "cache-cache-cache");
    }

    #[test]
    fn invalidate_removes_single_page() {
        let cache = FeedCache::new(&CacheConfig::default());
        cache.set(FeedKey::index(1), sample_page("one"), None);
        cache.set(FeedKey::index(2), sample_page("two"), None);

        assert!(cache.invalidate(&FeedKey::index(1)));
        assert!(!cache.invalidate(&FeedKey::index(1)));

        assert!(cache.get(&FeedKey::index(1)).is_none());
        assert!(cache.get(&FeedKey::index(2)).is_some());
    }

    #[test]
    fn invalidate_scope_drops_every_page_of_that_feed_only() {
        let cache = FeedCache::new(&CacheConfig::default());
        cache.set(FeedKey::group("test-slug1", 1), sample_page("a"), None);
        cache.set(FeedKey::group("test-slug1", 2), sample_page("b"), None);
        cache.set(FeedKey::group("test-slug2", 1), sample_page("c"), None);
        cache.set(FeedKey::index(1), sample_page("d"), None);

        let removed = cache.invalidate_scope(&ScopeKey::Group("test-slug1".into()));

        assert_eq!(removed, 2);
        assert!(cache.get(&FeedKey::group("test-slug1", 1)).is_none());
        assert!(cache.get(&FeedKey::group("test-slug1", 2)).is_none());
        assert!(cache.get(&FeedKey::group("test-slug2", 1)).is_some());
        assert!(cache.get(&FeedKey::index(1)).is_some());
    }

    #[test]
    fn clear_all_empties_cache() {
        let cache = FeedCache::new(&CacheConfig::default());
        cache.set(FeedKey::index(1), sample_page("a"), None);
        cache.set(FeedKey::follow(Uuid::nil(), 1), sample_page("b"), None);
        assert_eq!(cache.len(), 2);

        cache.clear_all();

        assert!(cache.is_empty());
        assert!(cache.get(&FeedKey::index(1)).is_none());
    }

    #[test]
    fn expired_entries_read_as_miss() {
        let cache = FeedCache::new(&CacheConfig::default());
        cache.set(FeedKey::index(1), sample_page("a"), Some(Duration::ZERO));

        assert!(cache.get(&FeedKey::index(1)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn unexpired_entries_survive() {
        let cache = FeedCache::new(&CacheConfig::default());
        cache.set(
            FeedKey::index(1),
            sample_page("a"),
            Some(Duration::from_secs(60)),
        );
        assert!(cache.get(&FeedKey::index(1)).is_some());
    }

    #[test]
    fn lru_eviction_respects_capacity() {
        let config = CacheConfig {
            capacity: 2,
            ..Default::default()
        };
        let cache = FeedCache::new(&config);

        cache.set(FeedKey::index(1), sample_page("1"), None);
        cache.set(FeedKey::index(2), sample_page("2"), None);
        assert!(cache.get(&FeedKey::index(1)).is_some());

        cache.set(FeedKey::index(3), sample_page("3"), None);

        assert!(cache.get(&FeedKey::index(1)).is_some());
        assert!(cache.get(&FeedKey::index(2)).is_none());
        assert!(cache.get(&FeedKey::index(3)).is_some());
    }

    #[test]
    fn disabled_cache_never_stores() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = FeedCache::new(&config);
        cache.set(FeedKey::index(1), sample_page("a"), None);

        assert!(cache.is_empty());
        assert!(cache.get(&FeedKey::index(1)).is_none());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let cache = FeedCache::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.pages.write().expect("pages lock should be acquired");
            panic!("poison pages lock");
        }));

        cache.set(FeedKey::index(1), sample_page("a"), None);
        assert!(cache.get(&FeedKey::index(1)).is_some());
    }

    #[test]
    fn fill_with_current_ticket_stores_page() {
        let cache = FeedCache::new(&CacheConfig::default());
        let key = FeedKey::index(1);
        let ticket = cache.ticket(&key.scope);

        assert!(cache.fill(key.clone(), sample_page("a"), None, ticket));
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn fill_after_scope_invalidation_is_discarded() {
        let cache = FeedCache::new(&CacheConfig::default());
        let key = FeedKey::index(1);
        let ticket = cache.ticket(&key.scope);

        // Nothing is cached yet; the invalidation must still win.
        assert_eq!(cache.invalidate_scope(&ScopeKey::Index), 0);

        assert!(!cache.fill(key.clone(), sample_page("stale"), None, ticket));
        assert!(cache.get(&key).is_none());

        let fresh = cache.ticket(&key.scope);
        assert!(cache.fill(key.clone(), sample_page("fresh"), None, fresh));
    }

    #[test]
    fn fill_after_clear_all_is_discarded() {
        let cache = FeedCache::new(&CacheConfig::default());
        let key = FeedKey::group("test-slug1", 1);
        cache.invalidate_scope(&key.scope);
        let ticket = cache.ticket(&key.scope);

        cache.clear_all();

        assert!(!cache.fill(key, sample_page("a"), None, ticket));
    }

    #[test]
    fn invalidating_other_feed_keeps_ticket_valid() {
        let cache = FeedCache::new(&CacheConfig::default());
        let key = FeedKey::index(1);
        let ticket = cache.ticket(&key.scope);

        cache.invalidate_scope(&ScopeKey::Author("SteveJ".into()));

        assert!(cache.fill(key, sample_page("a"), None, ticket));
    }
}
