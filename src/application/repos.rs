//! Content source trait describing the headless store adapter.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::entities::ImageRef;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content request failed: {0}")]
    Transport(String),
    #[error("content store answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("content response could not be decoded: {0}")]
    Decode(String),
    #[error("content request timed out")]
    Timeout,
}

impl ContentError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A named read query with its parameters.
///
/// Parameter values are JSON; string values are quoted by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentQuery {
    pub name: &'static str,
    pub groq: &'static str,
    pub params: Map<String, Value>,
}

impl ContentQuery {
    pub fn new(name: &'static str, groq: &'static str) -> Self {
        Self {
            name,
            groq,
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Read-only access to the headless content store.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a query and return the `result` member of the response.
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, ContentError>;

    /// Resolve an image reference to a cropped URL of the given size.
    fn image_url(&self, image: &ImageRef, width: u32, height: u32) -> Option<String>;
}
