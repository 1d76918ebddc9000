mod support;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use encore::{
    application::{
        clock::FixedClock, events::EventService, revalidate::RevalidationService,
    },
    cache::{CacheTag, InvalidationError, TagInvalidator},
    infra::http::{HttpState, build_router},
};
use serde_json::json;

use support::{NOW, SECRET, StubSource, app, event, get, post_webhook, site};

const EVENT_PAYLOAD: &str =
    r#"{"_type":"event","_id":"id-jazz-night","slug":{"current":"jazz-night"}}"#;

fn catalogue() -> Vec<serde_json::Value> {
    vec![
        event("jazz-night", "Jazz Night", "2025-03-20T20:30:00Z", "live-music"),
        event("techno-basement", "Techno Basement", "2025-03-15T22:00:00Z", "dj-set"),
    ]
}

#[tokio::test]
async fn missing_secret_is_unauthorized() {
    let app = app(StubSource::with_events(catalogue()));

    let (status, body) = post_webhook(&app.router, None, EVENT_PAYLOAD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Invalid secret" }));
}

#[tokio::test]
async fn wrong_secret_leaves_cache_untouched() {
    let source = StubSource::with_events(catalogue());
    let app = app(source.clone());
    get(&app.router, "/").await;
    assert_eq!(app.cache.l1.len(), 1);

    let (status, body) = post_webhook(&app.router, Some("not-the-secret"), EVENT_PAYLOAD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid secret");

    assert_eq!(app.cache.l1.len(), 1);
    get(&app.router, "/").await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn wrong_secret_is_rejected_before_parsing() {
    let app = app(StubSource::with_events(catalogue()));

    let (status, _) = post_webhook(&app.router, Some("nope"), "{not json").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn oversized_payload() -> String {
    format!(r#"{{"_type":"event","padding":"{}"}}"#, "x".repeat(3 * 1024 * 1024))
}

#[tokio::test]
async fn wrong_secret_with_oversized_body_is_unauthorized() {
    let app = app(StubSource::with_events(catalogue()));

    let (status, body) = post_webhook(&app.router, Some("nope"), &oversized_payload()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid secret");

    let (status, _) = post_webhook(&app.router, None, &oversized_payload()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_body_with_valid_secret_is_rejected_unread() {
    let app = app(StubSource::with_events(catalogue()));
    get(&app.router, "/").await;

    let (status, body) = post_webhook(&app.router, Some(SECRET), &oversized_payload()).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["message"], "Payload too large");
    assert_eq!(app.cache.l1.len(), 1);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app(StubSource::with_events(catalogue()));

    for body in ["{not json", "[1,2,3]", r#"{"_type": 42}"#] {
        let (status, response) = post_webhook(&app.router, Some(SECRET), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["message"], "Invalid JSON payload", "{body}");
    }
}

#[tokio::test]
async fn missing_type_is_bad_request() {
    let app = app(StubSource::with_events(catalogue()));

    for body in [r#"{"_id":"x"}"#, r#"{"_type":"  "}"#] {
        let (status, response) = post_webhook(&app.router, Some(SECRET), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["message"], "Missing _type", "{body}");
    }
}

#[tokio::test]
async fn event_change_reports_and_drops_listing_and_detail() {
    let source = StubSource::with_events(catalogue());
    let app = app(source.clone());
    get(&app.router, "/").await;
    get(&app.router, "/events/jazz-night").await;
    get(&app.router, "/events/techno-basement").await;
    assert_eq!(app.cache.l1.len(), 3);

    let (status, body) = post_webhook(&app.router, Some(SECRET), EVENT_PAYLOAD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "revalidated": true,
            "now": 1_741_975_200_000_i64,
            "document": "id-jazz-night",
            "type": "event"
        })
    );

    // Detail pages share the global event tag, so every cached page goes.
    assert!(app.cache.l1.is_empty());
    assert_eq!(app.cache.registry.key_count(), 0);
}

#[tokio::test]
async fn other_document_types_invalidate_globally() {
    let source = StubSource::with_events(catalogue());
    let app = app(source.clone());
    get(&app.router, "/").await;
    get(&app.router, "/events/jazz-night").await;

    let (status, body) = post_webhook(
        &app.router,
        Some(SECRET),
        r#"{"_type":"venue","_id":"venue-1","name":"Blue Room"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "venue");
    assert!(app.cache.l1.is_empty());
}

#[tokio::test]
async fn document_without_id_reports_null() {
    let app = app(StubSource::with_events(catalogue()));

    let (status, body) = post_webhook(&app.router, Some(SECRET), r#"{"_type":"artist"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["document"].is_null());
}

#[tokio::test]
async fn repeated_webhooks_are_idempotent() {
    let app = app(StubSource::with_events(catalogue()));

    for _ in 0..2 {
        let (status, body) = post_webhook(&app.router, Some(SECRET), EVENT_PAYLOAD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revalidated"], true);
    }
}

struct FailingInvalidator;

#[async_trait]
impl TagInvalidator for FailingInvalidator {
    async fn revalidate_tag(&self, tag: &CacheTag) -> Result<(), InvalidationError> {
        Err(InvalidationError::backend(tag, "backend offline"))
    }
}

#[tokio::test]
async fn invalidation_failure_is_server_error() {
    let state = HttpState {
        events: EventService::new(StubSource::with_events(catalogue())),
        revalidation: RevalidationService::new(SECRET, Arc::new(FailingInvalidator)),
        clock: Arc::new(FixedClock(NOW)),
        site: site(),
        cache: None,
    };
    let router = build_router(state);

    let (status, body) = post_webhook(&router, Some(SECRET), EVENT_PAYLOAD).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error revalidating");
    let detail = body["error"].as_str().expect("error detail");
    assert!(detail.contains("backend offline"), "{detail}");
}
