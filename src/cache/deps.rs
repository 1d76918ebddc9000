//! Tag collector for L1 cache registration.
//!
//! Uses `tokio::task_local!` so page data fetchers can record the tags of
//! what they read without threading a collector through every call. The
//! response cache middleware scopes a collector around the handler and
//! registers the stored response under whatever was recorded.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::future::Future;

use super::keys::CacheTag;

tokio::task_local! {
    static DEPS: RefCell<BTreeSet<CacheTag>>;
}

/// Record a tag the current response depends on.
///
/// If no collector is active, the call is silently ignored.
pub fn record(tag: CacheTag) {
    let _ = DEPS.try_with(|deps| {
        deps.borrow_mut().insert(tag);
    });
}

pub fn record_all<I>(tags: I)
where
    I: IntoIterator<Item = CacheTag>,
{
    let _ = DEPS.try_with(|deps| {
        deps.borrow_mut().extend(tags);
    });
}

/// Snapshot of the tags recorded so far in the current scope.
///
/// Returns an empty set outside of a collector scope.
pub fn collect() -> BTreeSet<CacheTag> {
    DEPS.try_with(|deps| deps.borrow().clone())
        .unwrap_or_default()
}

/// Run a future with a fresh collector and return its output together with
/// the recorded tags.
///
/// ```ignore
/// let (response, tags) = deps::with_collector(next.run(request)).await;
/// ```
pub async fn with_collector<F, R>(f: F) -> (R, BTreeSet<CacheTag>)
where
    F: Future<Output = R>,
{
    // The scope owns the cell, so collection has to happen before it ends.
    DEPS.scope(RefCell::new(BTreeSet::new()), async move {
        let result = f.await;
        (result, collect())
    })
    .await
}
