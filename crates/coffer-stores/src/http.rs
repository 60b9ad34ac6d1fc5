//! Shared helpers for the REST-backed stores

use coffer_core::{Error, Result, SecureString};
use reqwest::{RequestBuilder, Response, StatusCode};

/// What a request does to the remote resource
///
/// A 409 only means "already exists" when creating; on a replace it reports a
/// stale or conflicting update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Create,
    Read,
    Update,
}

/// Map a non-success HTTP status onto a normalized error
pub fn status_error(status: StatusCode, intent: Intent, what: &str, details: &str) -> Error {
    let message = if details.is_empty() {
        format!("{}: {}", what, status)
    } else {
        format!("{}: {} {}", what, status, details.trim())
    };

    match status {
        StatusCode::NOT_FOUND => Error::not_found(message),
        StatusCode::CONFLICT if intent == Intent::Create => Error::already_exists(message),
        StatusCode::CONFLICT => Error::transport(format!("conflicting update: {}", message)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::access_denied(message),
        _ => Error::transport(message),
    }
}

/// Send a request, mapping connection failures to `Transport`
pub async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
    request
        .send()
        .await
        .map_err(|e| Error::transport(format!("{}: {}", what, e)))
}

/// Pass a successful response through, otherwise turn it into an error
pub async fn check(response: Response, intent: Intent, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let details = response.text().await.unwrap_or_default();
    Err(status_error(status, intent, what, &details))
}

/// Decode a JSON response body
pub async fn json<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::transport(format!("{}: invalid response body: {}", what, e)))
}

/// `Authorization` header value for a bearer token
pub fn bearer(token: &SecureString) -> String {
    format!("Bearer {}", token.as_str())
}
