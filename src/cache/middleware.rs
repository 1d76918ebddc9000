//! L1 response cache middleware.
//!
//! Caches GET requests to the public pages and serves cached responses.
//! Entries are registered under the tags the handler recorded, so a
//! webhook can drop them without knowing their URLs.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument, warn};

use super::{
    CacheConfig, CacheRegistry, L1Store, StoreOutcome, deps,
    keys::{L1Key, OutputFormat, hash_query},
    store::CachedResponse,
};

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub l1: Arc<L1Store>,
    pub registry: Arc<CacheRegistry>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let l1 = Arc::new(L1Store::new(&config));
        Self {
            config,
            l1,
            registry: Arc::new(CacheRegistry::new()),
        }
    }
}

/// Middleware for L1 response caching.
///
/// Only caches GET requests that return 200 OK with at least one recorded
/// tag. A response whose render overlapped an invalidation is served but
/// not stored.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enable_l1_cache || request.method() != Method::GET {
        return next.run(request).await;
    }

    let l1_key = L1Key::Response {
        format: OutputFormat::Html,
        path: request.uri().path().to_string(),
        query_hash: hash_query(request.uri().query().unwrap_or("")),
    };

    if let Some(cached) = cache.l1.get(&l1_key) {
        counter!("encore_cache_l1_hit_total").increment(1);
        debug!(cache = "l1", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    counter!("encore_cache_l1_miss_total").increment(1);
    debug!(
        cache = "l1",
        outcome = "miss",
        "cache miss, executing handler"
    );

    let generation = cache.registry.generation();
    let (response, tags) = deps::with_collector(next.run(request)).await;

    if response.status() != StatusCode::OK || tags.is_empty() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "l1", error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if bytes.len() > cache.config.l1_response_body_limit_bytes {
        debug!(
            cache = "l1",
            body_len = bytes.len(),
            "response body exceeds cache limit; not storing"
        );
        return Response::from_parts(parts, Body::from(bytes));
    }

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter(|(name, _)| *name != header::SET_COOKIE)
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };

    let tag_count = tags.len();
    match cache
        .registry
        .store_if_current(&cache.l1, l1_key, tags, cached, generation)
    {
        StoreOutcome::Stored { evicted } => {
            debug!(cache = "l1", tag_count, "cached response");
            if evicted.is_some() {
                counter!("encore_cache_l1_evict_total").increment(1);
            }
        }
        StoreOutcome::Stale => debug!(
            cache = "l1",
            "invalidation raced the render; not storing response"
        ),
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Build a response from cached data.
fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
