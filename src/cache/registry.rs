//! Bidirectional tag registry.
//!
//! Tracks which stored responses depend on which cache tags so a tag can
//! be invalidated without knowing the URLs it covers.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::keys::{CacheTag, L1Key};
use super::lock::{rw_read, rw_write};
use super::store::{CachedResponse, L1Store};

const SOURCE: &str = "cache::registry";

/// Tracks tag → keys and key → tags mappings.
///
/// Both maps are updated under one write section so readers never see a
/// key registered on one side only.
pub struct CacheRegistry {
    maps: RwLock<Maps>,
    /// Bumped on every tag invalidation.
    generation: AtomicU64,
}

/// Result of [`CacheRegistry::store_if_current`].
#[derive(Debug, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Stored; `evicted` is the entry LRU pressure pushed out, if any.
    Stored { evicted: Option<L1Key> },
    /// An invalidation overlapped the render; nothing was stored.
    Stale,
}

#[derive(Default)]
struct Maps {
    tag_to_keys: HashMap<CacheTag, HashSet<L1Key>>,
    key_to_tags: HashMap<L1Key, BTreeSet<CacheTag>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(Maps::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store `response` and register its tags, unless an invalidation
    /// happened since `generation` was read.
    ///
    /// The generation check, the store insert and the tag mappings share the
    /// registry write section. `invalidate_tag` bumps the generation under
    /// that same section, so a response rendered before a webhook is either
    /// refused here or already registered when the webhook evicts its tags.
    pub fn store_if_current(
        &self,
        store: &L1Store,
        key: L1Key,
        tags: BTreeSet<CacheTag>,
        response: CachedResponse,
        generation: u64,
    ) -> StoreOutcome {
        let mut maps = rw_write(&self.maps, SOURCE, "store_if_current");
        if self.generation.load(Ordering::Acquire) != generation {
            return StoreOutcome::Stale;
        }

        if let Some(previous) = maps.key_to_tags.remove(&key) {
            maps.detach(&key, previous);
        }
        for tag in &tags {
            maps.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        maps.key_to_tags.insert(key.clone(), tags);

        let evicted = store.set(key, response);
        if let Some(evicted) = &evicted
            && let Some(tags) = maps.key_to_tags.remove(evicted)
        {
            maps.detach(evicted, tags);
        }
        StoreOutcome::Stored { evicted }
    }

    /// Drop every key carrying `tag` and advance the generation.
    ///
    /// Returns the keys that were registered under the tag; callers evict
    /// them from the store. Unknown tags yield an empty set.
    pub fn invalidate_tag(&self, tag: &CacheTag) -> HashSet<L1Key> {
        let mut maps = rw_write(&self.maps, SOURCE, "invalidate_tag");
        self.generation.fetch_add(1, Ordering::AcqRel);

        let affected = maps.tag_to_keys.remove(tag).unwrap_or_default();
        for key in &affected {
            if let Some(tags) = maps.key_to_tags.remove(key) {
                maps.detach(key, tags);
            }
        }
        affected
    }

    /// Number of stored responses with tag mappings.
    pub fn key_count(&self) -> usize {
        rw_read(&self.maps, SOURCE, "key_count").key_to_tags.len()
    }
}

impl Maps {
    fn detach(&mut self, key: &L1Key, tags: BTreeSet<CacheTag>) {
        for tag in tags {
            if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_to_keys.remove(&tag);
                }
            }
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::cache::{CacheConfig, keys::OutputFormat};

    fn key(path: &str) -> L1Key {
        L1Key::Response {
            format: OutputFormat::Html,
            path: path.to_string(),
            query_hash: 0,
        }
    }

    fn response(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: Vec::new(),
            body: Bytes::from(body),
        }
    }

    fn detail_tags(slug: &str) -> BTreeSet<CacheTag> {
        BTreeSet::from([CacheTag::for_slug(slug), CacheTag::Event])
    }

    fn put(
        registry: &CacheRegistry,
        store: &L1Store,
        path: &str,
        tags: BTreeSet<CacheTag>,
    ) -> StoreOutcome {
        registry.store_if_current(
            store,
            key(path),
            tags,
            response("page"),
            registry.generation(),
        )
    }

    #[test]
    fn store_registers_and_inserts() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig::default());

        assert_eq!(
            put(&registry, &store, "/events/a", detail_tags("a")),
            StoreOutcome::Stored { evicted: None }
        );
        assert!(store.get(&key("/events/a")).is_some());
        assert_eq!(registry.key_count(), 1);
    }

    #[test]
    fn slug_tag_only_hits_its_page() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig::default());
        put(&registry, &store, "/events/a", detail_tags("a"));
        put(&registry, &store, "/events/b", detail_tags("b"));

        let affected = registry.invalidate_tag(&CacheTag::for_slug("a"));
        assert_eq!(affected, HashSet::from([key("/events/a")]));
        assert_eq!(registry.key_count(), 1);

        let affected = registry.invalidate_tag(&CacheTag::Event);
        assert_eq!(affected, HashSet::from([key("/events/b")]));
    }

    #[test]
    fn global_tag_hits_every_detail_page() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig::default());
        put(&registry, &store, "/events/a", detail_tags("a"));
        put(&registry, &store, "/events/b", detail_tags("b"));
        put(&registry, &store, "/", BTreeSet::from([CacheTag::Events]));

        let affected = registry.invalidate_tag(&CacheTag::Event);
        assert_eq!(affected.len(), 2);
        assert_eq!(registry.key_count(), 1);
    }

    #[test]
    fn invalidating_unknown_tag_is_a_noop() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig::default());
        put(&registry, &store, "/", BTreeSet::from([CacheTag::Events]));

        assert!(registry.invalidate_tag(&CacheTag::for_slug("nope")).is_empty());
        assert!(registry.invalidate_tag(&CacheTag::Event).is_empty());
        assert_eq!(registry.key_count(), 1);
    }

    #[test]
    fn stale_generation_refuses_the_store() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig::default());
        let seen = registry.generation();

        registry.invalidate_tag(&CacheTag::Events);

        let outcome = registry.store_if_current(
            &store,
            key("/"),
            BTreeSet::from([CacheTag::Events]),
            response("stale"),
            seen,
        );
        assert_eq!(outcome, StoreOutcome::Stale);
        assert!(store.is_empty());
        assert_eq!(registry.key_count(), 0);

        assert_eq!(
            put(&registry, &store, "/", BTreeSet::from([CacheTag::Events])),
            StoreOutcome::Stored { evicted: None }
        );
    }

    #[test]
    fn stored_entry_is_always_reachable_by_its_tags() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig::default());
        let seen = registry.generation();

        registry.store_if_current(
            &store,
            key("/"),
            BTreeSet::from([CacheTag::Events]),
            response("rendered"),
            seen,
        );
        for evicted in registry.invalidate_tag(&CacheTag::Events) {
            store.invalidate(&evicted);
        }

        assert!(store.is_empty());
        assert_eq!(registry.key_count(), 0);
    }

    #[test]
    fn eviction_drops_mappings_of_the_evicted_key() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig {
            l1_response_limit: 1,
            ..Default::default()
        });
        put(&registry, &store, "/events/a", detail_tags("a"));

        assert_eq!(
            put(&registry, &store, "/events/b", detail_tags("b")),
            StoreOutcome::Stored {
                evicted: Some(key("/events/a"))
            }
        );
        assert_eq!(registry.key_count(), 1);
        assert!(registry.invalidate_tag(&CacheTag::for_slug("a")).is_empty());
    }

    #[test]
    fn re_storing_replaces_previous_tags() {
        let registry = CacheRegistry::new();
        let store = L1Store::new(&CacheConfig::default());
        put(&registry, &store, "/events/a", detail_tags("a"));
        put(&registry, &store, "/events/a", BTreeSet::from([CacheTag::Event]));

        assert!(registry.invalidate_tag(&CacheTag::for_slug("a")).is_empty());
        assert_eq!(registry.key_count(), 1);
    }
}
