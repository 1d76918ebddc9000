//! Tag invalidation seam between the webhook and the page cache.

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use super::keys::CacheTag;
use super::middleware::CacheState;

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("cache backend rejected invalidation of `{tag}`: {reason}")]
    Backend { tag: String, reason: String },
}

impl InvalidationError {
    pub fn backend(tag: &CacheTag, reason: impl Into<String>) -> Self {
        Self::Backend {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

/// Marks every cached output carrying a tag as stale.
///
/// Implementations must be idempotent: invalidating a tag that is unknown
/// or already stale succeeds without effect.
#[async_trait]
pub trait TagInvalidator: Send + Sync {
    async fn revalidate_tag(&self, tag: &CacheTag) -> Result<(), InvalidationError>;
}

/// Invalidates tags against the in-process L1 store.
#[derive(Clone)]
pub struct CacheInvalidator {
    state: CacheState,
}

impl CacheInvalidator {
    pub fn new(state: CacheState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl TagInvalidator for CacheInvalidator {
    async fn revalidate_tag(&self, tag: &CacheTag) -> Result<(), InvalidationError> {
        let keys = self.state.registry.invalidate_tag(tag);
        for key in &keys {
            self.state.l1.invalidate(key);
        }

        counter!("encore_cache_invalidations_total").increment(1);
        debug!(cache = "l1", %tag, evicted = keys.len(), "tag invalidated");
        Ok(())
    }
}
