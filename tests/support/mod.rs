#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use encore::{
    application::{
        clock::FixedClock,
        events::EventService,
        repos::{ContentError, ContentQuery, ContentSource},
        revalidate::RevalidationService,
    },
    cache::{CacheConfig, CacheInvalidator, CacheState},
    config::SiteSettings,
    domain::entities::ImageRef,
    infra::http::{HttpState, build_router},
};
use serde_json::{Value, json};
use time::{OffsetDateTime, UtcOffset, macros::datetime};
use tower::ServiceExt;
use url::Url;

pub const SECRET: &str = "test-webhook-secret";
pub const NOW: OffsetDateTime = datetime!(2025-03-14 18:00 UTC);

/// In-memory content store answering the two page queries.
#[derive(Default)]
pub struct StubSource {
    events: Mutex<Vec<Value>>,
    failure: Mutex<Option<fn() -> ContentError>>,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn with_events(events: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            ..Default::default()
        })
    }

    pub fn set_events(&self, events: Vec<Value>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn fail_with(&self, make: fn() -> ContentError) {
        *self.failure.lock().unwrap() = Some(make);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn detail(&self, slug: &str) -> Value {
        let events = self.events.lock().unwrap();
        let event = events
            .iter()
            .find(|event| event["slug"]["current"] == slug)
            .cloned()
            .unwrap_or(Value::Null);
        let related: Vec<Value> = events
            .iter()
            .filter(|event| event["slug"]["current"] != slug)
            .cloned()
            .collect();
        json!({ "event": event, "relatedEvents": related })
    }
}

#[async_trait]
impl ContentSource for StubSource {
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = *self.failure.lock().unwrap() {
            return Err(make());
        }

        match query.name {
            "list_events" => Ok(Value::Array(self.events.lock().unwrap().clone())),
            "event_detail" => {
                let slug = query.params["slug"].as_str().unwrap_or_default().to_string();
                Ok(self.detail(&slug))
            }
            other => panic!("unexpected query {other}"),
        }
    }

    fn image_url(&self, _image: &ImageRef, width: u32, height: u32) -> Option<String> {
        Some(format!("https://img.test/{width}x{height}"))
    }
}

pub fn event(slug: &str, name: &str, date: &str, event_type: &str) -> Value {
    json!({
        "_id": format!("id-{slug}"),
        "name": name,
        "slug": { "current": slug },
        "date": date,
        "eventType": event_type,
        "ticketsPrice": 25,
        "venue": { "name": "Blue Room" },
        "headline": { "name": format!("{name} Band") },
        "image": { "asset": { "_ref": "image-abc-400x225-png" } }
    })
}

pub fn site() -> SiteSettings {
    SiteSettings {
        title: "Encore".to_string(),
        public_url: Url::parse("https://encore.test/").unwrap(),
        utc_offset: UtcOffset::UTC,
    }
}

pub struct TestApp {
    pub router: Router,
    pub cache: CacheState,
    pub source: Arc<StubSource>,
}

pub fn app(source: Arc<StubSource>) -> TestApp {
    app_with_cache(source, CacheConfig::default())
}

pub fn app_with_cache(source: Arc<StubSource>, config: CacheConfig) -> TestApp {
    let cache = CacheState::new(config);
    let invalidator = CacheInvalidator::new(cache.clone());

    let state = HttpState {
        events: EventService::new(source.clone()),
        revalidation: RevalidationService::new(SECRET, Arc::new(invalidator)),
        clock: Arc::new(FixedClock(NOW)),
        site: site(),
        cache: Some(cache.clone()),
    };

    TestApp {
        router: build_router(state),
        cache,
        source,
    }
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn post_webhook(
    router: &Router,
    secret: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/revalidate")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-webhook-secret", secret);
    }
    let request = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
