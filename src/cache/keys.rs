//! Cache key definitions.
//!
//! `CacheTag` labels rendered output by what it depends on; `L1Key`
//! addresses one stored response.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

const EVENTS_TAG: &str = "events";
const EVENT_TAG: &str = "event";
const EVENT_SLUG_PREFIX: &str = "event-";

/// Invalidation label attached to rendered pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    /// The home listing.
    Events,
    /// Every detail page.
    Event,
    /// The detail page of one event, by slug.
    EventSlug(String),
}

impl CacheTag {
    pub fn for_slug(slug: impl Into<String>) -> Self {
        Self::EventSlug(slug.into())
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::Events => f.write_str(EVENTS_TAG),
            CacheTag::Event => f.write_str(EVENT_TAG),
            CacheTag::EventSlug(slug) => write!(f, "{EVENT_SLUG_PREFIX}{slug}"),
        }
    }
}

/// Output format for L1 response cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Html,
}

/// L1 response cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum L1Key {
    Response {
        format: OutputFormat,
        path: String,
        query_hash: u64,
    },
}

/// Hash a query string for L1 cache key generation.
pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}
