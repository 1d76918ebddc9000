//! HTTP adapter for the Sanity query API.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::application::repos::{ContentError, ContentQuery, ContentSource};
use crate::config::ContentSettings;
use crate::domain::entities::ImageRef;

use super::error::InfraError;

const IMAGE_CDN_BASE: &str = "https://cdn.sanity.io/images";
const IMAGE_REF_PREFIX: &str = "image-";
const ERROR_BODY_PREVIEW_CHARS: usize = 256;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SanityClient {
    client: Client,
    base: Url,
    project_id: String,
    dataset: String,
    api_version: String,
}

impl SanityClient {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let base = match settings.api_base_url.as_ref() {
            Some(url) => url.clone(),
            None => {
                let host = if settings.use_cdn { "apicdn" } else { "api" };
                Url::parse(&format!(
                    "https://{}.{host}.sanity.io",
                    settings.project_id
                ))
                .map_err(|err| InfraError::content_client(err.to_string()))?
            }
        };

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::content_client(err.to_string()))?;

        Ok(Self {
            client,
            base,
            project_id: settings.project_id.clone(),
            dataset: settings.dataset.clone(),
            api_version: settings.api_version.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("encore/", env!("CARGO_PKG_VERSION"))
    }

    /// Full request URL for a query, parameters encoded as `$name=<json>`.
    pub fn query_url(&self, query: &ContentQuery) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!(
            "{prefix}/v{}/data/query/{}",
            self.api_version, self.dataset
        ));
        url.set_query(None);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query.groq);
            for (name, value) in &query.params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl ContentSource for SanityClient {
    #[instrument(skip(self, query), fields(query = query.name))]
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, ContentError> {
        let url = self.query_url(query);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let message = error_message(&bytes);
            warn!(status = status.as_u16(), %message, "content query rejected");
            return Err(ContentError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: QueryResponse = serde_json::from_slice(&bytes).map_err(ContentError::decode)?;
        debug!(bytes = bytes.len(), "content query answered");
        Ok(body.result)
    }

    fn image_url(&self, image: &ImageRef, width: u32, height: u32) -> Option<String> {
        let reference = image.asset.as_ref()?.reference.as_str();
        let (id, dimensions, format) = parse_image_ref(reference)?;
        Some(format!(
            "{IMAGE_CDN_BASE}/{}/{}/{id}-{dimensions}.{format}?w={width}&h={height}&fit=crop",
            self.project_id, self.dataset
        ))
    }
}

/// Split `image-<id>-<W>x<H>-<ext>` into its parts.
fn parse_image_ref(reference: &str) -> Option<(&str, &str, &str)> {
    let rest = reference.strip_prefix(IMAGE_REF_PREFIX)?;
    let (rest, format) = rest.rsplit_once('-')?;
    let (id, dimensions) = rest.rsplit_once('-')?;

    let (width, height) = dimensions.split_once('x')?;
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if id.is_empty() || format.is_empty() || !numeric(width) || !numeric(height) {
        return None;
    }
    Some((id, dimensions, format))
}

fn map_reqwest_error(err: reqwest::Error) -> ContentError {
    if err.is_timeout() {
        ContentError::Timeout
    } else {
        ContentError::transport(err)
    }
}

fn error_message(bytes: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorResponse>(bytes)
        && let Some(description) = parsed.error.description
    {
        return description;
    }
    String::from_utf8_lossy(bytes)
        .chars()
        .take(ERROR_BODY_PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::domain::entities::AssetRef;

    fn settings() -> ContentSettings {
        ContentSettings {
            project_id: "oq18vj0i".to_string(),
            dataset: "production".to_string(),
            api_version: "2024-11-01".to_string(),
            use_cdn: false,
            api_base_url: None,
            request_timeout: Duration::from_secs(5),
        }
    }

    fn image(reference: &str) -> ImageRef {
        ImageRef {
            asset: Some(AssetRef {
                reference: reference.to_string(),
            }),
        }
    }

    #[test]
    fn query_url_targets_project_host() {
        let client = SanityClient::new(&settings()).expect("client");
        let query = ContentQuery::new("detail", "*[slug.current == $slug][0]")
            .param("slug", "jazz-night");

        let url = client.query_url(&query);
        assert_eq!(url.host_str(), Some("oq18vj0i.api.sanity.io"));
        assert_eq!(url.path(), "/v2024-11-01/data/query/production");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("query".to_string(), "*[slug.current == $slug][0]".to_string()),
                ("$slug".to_string(), "\"jazz-night\"".to_string()),
            ]
        );
    }

    #[test]
    fn cdn_toggle_switches_host() {
        let client = SanityClient::new(&ContentSettings {
            use_cdn: true,
            ..settings()
        })
        .expect("client");

        let url = client.query_url(&ContentQuery::new("list", "*"));
        assert_eq!(url.host_str(), Some("oq18vj0i.apicdn.sanity.io"));
    }

    #[test]
    fn base_override_keeps_path_prefix() {
        let client = SanityClient::new(&ContentSettings {
            api_base_url: Some(Url::parse("http://proxy.local/sanity/").unwrap()),
            ..settings()
        })
        .expect("client");

        let url = client.query_url(&ContentQuery::new("list", "*"));
        assert_eq!(
            url.path(),
            "/sanity/v2024-11-01/data/query/production"
        );
    }

    #[test]
    fn image_url_is_built_from_reference() {
        let client = SanityClient::new(&settings()).expect("client");
        let url = client.image_url(&image("image-abc123-1200x800-jpg"), 400, 225);

        assert_eq!(
            url.as_deref(),
            Some(
                "https://cdn.sanity.io/images/oq18vj0i/production/abc123-1200x800.jpg?w=400&h=225&fit=crop"
            )
        );
    }

    #[test]
    fn malformed_references_yield_no_url() {
        let client = SanityClient::new(&settings()).expect("client");
        for reference in ["file-abc-pdf", "image-abc-png", "image-abc-12x-png", "image--1x1-png"] {
            assert!(client.image_url(&image(reference), 10, 10).is_none(), "{reference}");
        }
        assert!(
            client
                .image_url(&ImageRef { asset: None }, 10, 10)
                .is_none()
        );
    }

    #[test]
    fn error_message_prefers_description() {
        let body = json!({ "error": { "description": "param $slug referenced, but not provided" } });
        assert_eq!(
            error_message(body.to_string().as_bytes()),
            "param $slug referenced, but not provided"
        );
        assert_eq!(error_message(b"Bad Gateway"), "Bad Gateway");
    }
}
