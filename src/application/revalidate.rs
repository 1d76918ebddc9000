//! Webhook-driven revalidation: authenticate, resolve tags, invalidate.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use encore_api_types::{RevalidateResponse, WebhookDocument};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::cache::{CacheTag, InvalidationError, TagInvalidator};

const EVENT_DOCUMENT_TYPE: &str = "event";

#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error("missing or mismatched webhook secret")]
    Unauthorized,
    #[error("request body could not be read within {limit} bytes")]
    Body {
        limit: usize,
        #[source]
        source: axum::Error,
    },
    #[error("request body is not a valid JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload is missing a non-empty `_type`")]
    MissingType,
    #[error("failed to invalidate `{tag}`")]
    Invalidation {
        tag: String,
        #[source]
        source: InvalidationError,
    },
}

impl RevalidateError {
    /// Stable label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            RevalidateError::Unauthorized => "unauthorized",
            RevalidateError::Body { .. }
            | RevalidateError::InvalidJson(_)
            | RevalidateError::MissingType => "invalid_payload",
            RevalidateError::Invalidation { .. } => "invalidation_failed",
        }
    }
}

/// Tags made stale by a change to a document of `doc_type`.
///
/// Event documents also stale their own detail page when the slug is known.
/// Every other type (venues, artists, anything new) conservatively stales
/// both global tags, since any event may embed it.
pub fn tags_for_document(doc_type: &str, slug: Option<&str>) -> Vec<CacheTag> {
    let mut tags = vec![CacheTag::Events, CacheTag::Event];
    if doc_type == EVENT_DOCUMENT_TYPE
        && let Some(slug) = slug.map(str::trim).filter(|slug| !slug.is_empty())
    {
        tags.push(CacheTag::for_slug(slug));
    }
    tags
}

#[derive(Clone)]
pub struct RevalidationService {
    secret_digest: [u8; 32],
    invalidator: Arc<dyn TagInvalidator>,
}

impl RevalidationService {
    pub fn new(secret: &str, invalidator: Arc<dyn TagInvalidator>) -> Self {
        Self {
            secret_digest: digest(secret.as_bytes()),
            invalidator,
        }
    }

    /// Constant-time check of the presented secret.
    pub fn authenticate(&self, presented: Option<&[u8]>) -> Result<(), RevalidateError> {
        let Some(presented) = presented else {
            return Err(RevalidateError::Unauthorized);
        };
        let matches: bool = digest(presented)[..]
            .ct_eq(&self.secret_digest[..])
            .into();
        if matches {
            Ok(())
        } else {
            Err(RevalidateError::Unauthorized)
        }
    }

    /// Authenticate, parse and invalidate.
    ///
    /// `body` is only awaited once the secret matches, so an unauthenticated
    /// request is rejected without reading its payload.
    pub async fn revalidate<B>(
        &self,
        presented_secret: Option<&[u8]>,
        body: B,
        now: OffsetDateTime,
    ) -> Result<RevalidateResponse, RevalidateError>
    where
        B: Future<Output = Result<Bytes, RevalidateError>>,
    {
        self.authenticate(presented_secret)?;

        let body = body.await?;
        let document: WebhookDocument = serde_json::from_slice(&body)?;
        let doc_type = document
            .doc_type()
            .ok_or(RevalidateError::MissingType)?
            .to_string();

        let tags = tags_for_document(&doc_type, document.slug());
        self.invalidate_all(&tags).await?;

        info!(
            doc_type = %doc_type,
            document = document.id.as_deref().unwrap_or("-"),
            tags = %join_tags(&tags),
            "content revalidated"
        );

        Ok(RevalidateResponse {
            revalidated: true,
            now: epoch_millis(now),
            document: document.id.clone(),
            doc_type,
        })
    }

    /// Attempts every tag even after a failure, then reports the first one.
    async fn invalidate_all(&self, tags: &[CacheTag]) -> Result<(), RevalidateError> {
        let mut first_failure = None;
        for tag in tags {
            if let Err(source) = self.invalidator.revalidate_tag(tag).await {
                warn!(%tag, error = %source, "tag invalidation failed");
                first_failure.get_or_insert(RevalidateError::Invalidation {
                    tag: tag.to_string(),
                    source,
                });
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn epoch_millis(now: OffsetDateTime) -> i64 {
    i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn join_tags(tags: &[CacheTag]) -> String {
    tags.iter()
        .map(CacheTag::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
