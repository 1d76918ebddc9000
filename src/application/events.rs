//! Page data fetcher for the listing and detail pages.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::application::error::HttpError;
use crate::application::repos::{ContentError, ContentQuery, ContentSource};
use crate::cache::{CacheTag, deps};
use crate::domain::entities::{EventDetailRecord, EventRecord, ImageRef};

const RELATED_EVENT_LIMIT: usize = 3;

const LIST_EVENTS_QUERY: &str = r#"*[_type == "event" && defined(slug.current) && defined(date)]{
  _id, name, slug, date, ticketsPrice, image, eventType, venue->, headline->
} | order(date asc)"#;

const EVENT_DETAIL_QUERY: &str = r#"{
  "event": *[_type == "event" && slug.current == $slug][0]{
    ...,
    "date": coalesce(date, $now),
    "doorsOpen": coalesce(doorsOpen, 0),
    headline->,
    venue->
  },
  "relatedEvents": *[_type == "event" && defined(slug.current) && slug.current != $slug && date > $now]
    | order(date asc)[0...3]{
      _id, name, slug, date, image, eventType, ticketsPrice
    }
}"#;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("event `{slug}` does not exist")]
    NotFound { slug: String },
    #[error(transparent)]
    Source(#[from] ContentError),
    #[error("query `{query}` returned an unexpected shape: {reason}")]
    Decode { query: &'static str, reason: String },
}

impl From<FetchError> for HttpError {
    fn from(error: FetchError) -> Self {
        const SOURCE: &str = "application::events::FetchError";
        match &error {
            FetchError::NotFound { slug } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Event not found",
                format!("no event with slug `{slug}`"),
            ),
            FetchError::Source(ContentError::Timeout) => HttpError::from_error(
                SOURCE,
                StatusCode::GATEWAY_TIMEOUT,
                "Content source timed out",
                &error,
            ),
            FetchError::Source(_) | FetchError::Decode { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Content could not be loaded",
                &error,
            ),
        }
    }
}

/// Fetched data together with the tags the rendered output depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub data: T,
    pub tags: BTreeSet<CacheTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDetail {
    pub event: EventRecord,
    pub related: Vec<EventRecord>,
}

#[derive(Clone)]
pub struct EventService {
    source: Arc<dyn ContentSource>,
}

impl EventService {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// All listable events, earliest first.
    #[instrument(skip(self))]
    pub async fn list_events(&self) -> Result<Tagged<Vec<EventRecord>>, FetchError> {
        let tags = BTreeSet::from([CacheTag::Events]);
        deps::record_all(tags.iter().cloned());

        let query = ContentQuery::new("list_events", LIST_EVENTS_QUERY);
        let value = self.source.fetch(&query).await?;
        let events: Vec<EventRecord> = decode(query.name, nullable_list(value))?;

        debug!(count = events.len(), "events listed");
        Ok(Tagged { data: events, tags })
    }

    /// The event with `slug` and up to three later events.
    #[instrument(skip(self, now))]
    pub async fn event_detail(
        &self,
        slug: &str,
        now: OffsetDateTime,
    ) -> Result<Tagged<EventDetail>, FetchError> {
        let tags = BTreeSet::from([CacheTag::for_slug(slug), CacheTag::Event]);
        deps::record_all(tags.iter().cloned());

        let now = now
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|err| FetchError::Decode {
                query: "event_detail",
                reason: err.to_string(),
            })?;
        let query = ContentQuery::new("event_detail", EVENT_DETAIL_QUERY)
            .param("slug", slug)
            .param("now", now);

        let value = self.source.fetch(&query).await?;
        let record: EventDetailRecord = decode(query.name, value)?;

        let Some(event) = record.event else {
            return Err(FetchError::NotFound {
                slug: slug.to_string(),
            });
        };

        let mut related = record.related_events;
        related.retain(|candidate| candidate.slug() != slug);
        related.truncate(RELATED_EVENT_LIMIT);

        Ok(Tagged {
            data: EventDetail { event, related },
            tags,
        })
    }

    pub fn image_url(&self, image: Option<&ImageRef>, width: u32, height: u32) -> Option<String> {
        image.and_then(|image| self.source.image_url(image, width, height))
    }
}

fn nullable_list(value: Value) -> Value {
    match value {
        Value::Null => Value::Array(Vec::new()),
        other => other,
    }
}

fn decode<T: DeserializeOwned>(query: &'static str, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|err| FetchError::Decode {
        query,
        reason: err.to_string(),
    })
}
