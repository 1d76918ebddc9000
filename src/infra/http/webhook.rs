//! `POST /api/revalidate`: content-store webhook receiver.

use std::error::Error as _;

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use encore_api_types::WebhookErrorBody;

use crate::application::error::ErrorReport;
use crate::application::revalidate::RevalidateError;

use super::HttpState;

pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Largest payload read once the secret matches.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

const SOURCE: &str = "infra::http::webhook::revalidate";

pub(super) async fn revalidate(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let secret = headers.get(SECRET_HEADER).map(|value| value.as_bytes());
    let body = async move {
        to_bytes(body, MAX_WEBHOOK_BODY_BYTES)
            .await
            .map_err(|source| RevalidateError::Body {
                limit: MAX_WEBHOOK_BODY_BYTES,
                source,
            })
    };

    let result = state
        .revalidation
        .revalidate(secret, body, state.clock.now())
        .await;

    let outcome = match &result {
        Ok(_) => "revalidated",
        Err(err) => err.outcome(),
    };
    metrics::counter!("encore_webhook_requests_total", "outcome" => outcome).increment(1);

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: RevalidateError) -> Response {
    let (status, message, detail) = match &err {
        RevalidateError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid secret", None),
        RevalidateError::Body { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large", None),
        RevalidateError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "Invalid JSON payload", None),
        RevalidateError::MissingType => (StatusCode::BAD_REQUEST, "Missing _type", None),
        RevalidateError::Invalidation { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error revalidating",
            Some(error_chain(&err)),
        ),
    };

    let body = WebhookErrorBody {
        message: message.to_string(),
        error: detail,
    };
    let mut response = (status, Json(body)).into_response();
    ErrorReport::from_error(SOURCE, status, &err).attach(&mut response);
    response
}

fn error_chain(err: &RevalidateError) -> String {
    match err.source() {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}
