//! L1 HTTP response cache for rendered pages.

use std::sync::RwLock;

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::L1Key;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// L1 response cache storage.
pub struct L1Store {
    responses: RwLock<LruCache<L1Key, CachedResponse>>,
}

impl L1Store {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.l1_response_limit_non_zero())),
        }
    }

    pub fn get(&self, key: &L1Key) -> Option<CachedResponse> {
        rw_write(&self.responses, SOURCE, "l1_get")
            .get(key)
            .cloned()
    }

    /// Store a response, returning the key pushed out by LRU eviction.
    pub fn set(&self, key: L1Key, response: CachedResponse) -> Option<L1Key> {
        let mut responses = rw_write(&self.responses, SOURCE, "l1_set");
        let replaced = responses.contains(&key);
        match responses.push(key, response) {
            // `push` hands back the old entry when the key already existed.
            Some(_) if replaced => None,
            Some((evicted_key, _)) => Some(evicted_key),
            None => None,
        }
    }

    pub fn invalidate(&self, key: &L1Key) {
        rw_write(&self.responses, SOURCE, "l1_invalidate").pop(key);
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "l1_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::super::keys::OutputFormat;
    use super::*;

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
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Bytes::from(body),
        }
    }

    #[test]
    fn l1_response_cache_roundtrip() {
        let store = L1Store::new(&CacheConfig::default());
        let key = key("/events/test");

        assert!(store.get(&key).is_none());
        assert!(store.set(key.clone(), response("Hello")).is_none());

        let cached = store.get(&key).expect("cached response");
        assert_eq!(cached.status, 200);
        assert_eq!(cached.body, Bytes::from("Hello"));

        store.invalidate(&key);
        assert!(store.get(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn lru_eviction_reports_evicted_key() {
        let store = L1Store::new(&CacheConfig {
            l1_response_limit: 2,
            ..Default::default()
        });

        store.set(key("/a"), response("a"));
        store.set(key("/b"), response("b"));
        store.get(&key("/a"));

        let evicted = store.set(key("/c"), response("c"));
        assert_eq!(evicted, Some(key("/b")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn overwriting_a_key_is_not_an_eviction() {
        let store = L1Store::new(&CacheConfig::default());
        store.set(key("/a"), response("first"));

        assert!(store.set(key("/a"), response("second")).is_none());
        assert_eq!(
            store.get(&key("/a")).map(|cached| cached.body),
            Some(Bytes::from("second"))
        );
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = L1Store::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .responses
                .write()
                .expect("responses lock should be acquired");
            panic!("poison responses lock");
        }));

        store.set(key("/a"), response("a"));
        assert!(store.get(&key("/a")).is_some());
    }
}
