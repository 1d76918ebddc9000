//! Wire types for the Encore revalidation webhook.
//!
//! The content store posts one [`WebhookDocument`] per changed document.
//! Encore answers with [`RevalidateResponse`] on success and
//! [`WebhookErrorBody`] otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat webhook projection of a changed document.
///
/// Every field is optional on the wire so that the server can tell a
/// malformed body apart from an incomplete one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookDocument {
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<SlugRef>,
    /// Remaining projection fields; carried but never interpreted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WebhookDocument {
    /// Document type, if present and non-blank.
    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Slug of the document, if present and non-blank.
    pub fn slug(&self) -> Option<&str> {
        self.slug
            .as_ref()
            .and_then(|slug| slug.current.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlugRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
}

/// Body of a successful revalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    /// Milliseconds since the Unix epoch at which the tags were dropped.
    pub now: i64,
    pub document: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
}

/// Body of every non-2xx webhook response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
