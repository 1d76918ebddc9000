use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;

use crate::cache::response_cache_layer;
use crate::domain::listing::EventFilter;
use crate::presentation::views::{
    CARD_IMAGE_SIZE, EventTemplate, IndexTemplate, LayoutContext, build_detail_context,
    build_index_context, render_error_response, render_not_found_response,
    render_template_response,
};

use super::HttpState;
use super::middleware::{log_responses, set_request_context};
use super::webhook::revalidate;

pub fn build_router(state: HttpState) -> Router {
    // Rendered pages go through the response cache; everything else bypasses it.
    let cached_routes = Router::new()
        .route("/", get(index))
        .route("/events/{slug}", get(event_detail))
        .fallback(fallback_router);

    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    let uncached_routes = Router::new()
        .route("/_health", get(health))
        .route("/api/revalidate", post(revalidate));

    cached_routes
        .merge(uncached_routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingQuery {
    q: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
}

async fn index(State(state): State<HttpState>, Query(query): Query<ListingQuery>) -> Response {
    let filter = EventFilter::new(query.q.as_deref(), query.event_type.as_deref());

    let listed = match state.events.list_events().await {
        Ok(listed) => listed,
        Err(err) => return render_error_response(state.chrome(), err.into()),
    };

    let (width, height) = CARD_IMAGE_SIZE;
    let content = build_index_context(
        &listed.data,
        &filter,
        state.clock.now(),
        state.site.utc_offset,
        |event| state.events.image_url(event.image.as_ref(), width, height),
    );

    let view = LayoutContext::new(state.chrome(), content);
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn event_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let now = state.clock.now();

    let detail = match state.events.event_detail(&slug, now).await {
        Ok(detail) => detail.data,
        Err(err) => return render_error_response(state.chrome(), err.into()),
    };

    let chrome = state
        .chrome()
        .with_canonical_path(&format!("/events/{}", detail.event.slug()))
        .with_title(detail.event.name.trim());
    let page_url = chrome.meta.canonical.clone();

    let content = build_detail_context(
        &detail.event,
        &detail.related,
        &page_url,
        now,
        state.site.utc_offset,
        |event, (width, height)| state.events.image_url(event.image.as_ref(), width, height),
    );

    let view = LayoutContext::new(chrome, content);
    render_template_response(EventTemplate { view }, StatusCode::OK)
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback_router(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome())
}
