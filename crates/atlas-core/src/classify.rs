//! Maps raw remote outcomes onto the [`ErrorKind`] taxonomy.
//!
//! Rules, in order:
//! - transport failure before a response: `NetworkError`
//! - error response whose body is not a parsable error document:
//!   `ServerError` for 5xx, otherwise unclassified (terminal)
//! - 404 `NotFound`, 409 `Conflict`, 429 `RateLimited`, >=500 `ServerError`,
//!   any other 4xx `ClientError`

use std::fmt;

use serde::Deserialize;

use crate::error::{Backend, ErrorKind, ProviderError};

/// Error document returned by the organization API.
///
/// Every field is optional; any JSON object counts as a parsable body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Numeric error code (usually repeats the HTTP status).
    pub error: Option<u16>,
    /// Symbolic error code.
    pub error_code: Option<String>,
    /// Human-readable detail.
    pub detail: Option<String>,
    /// Short reason phrase.
    pub reason: Option<String>,
}

impl ApiErrorBody {
    /// Parses an error body, returning `None` when it is not a JSON object.
    #[must_use]
    pub fn parse(body: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Renders the body as a single message line.
    #[must_use]
    pub fn message(&self) -> String {
        let reason = self.reason.as_deref().unwrap_or_default();
        let detail = self.detail.as_deref().unwrap_or_default();
        match (reason.is_empty(), detail.is_empty()) {
            (false, false) => format!("{reason} - {detail}"),
            (false, true) => reason.to_string(),
            (true, false) => detail.to_string(),
            (true, true) => self.error_code.clone().unwrap_or_default(),
        }
    }
}

/// Classifies an HTTP status code.
///
/// Returns `None` for statuses below 400, which are not errors.
#[must_use]
pub fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        0..=399 => None,
        404 => Some(ErrorKind::NotFound),
        409 => Some(ErrorKind::Conflict),
        429 => Some(ErrorKind::RateLimited),
        400..=499 => Some(ErrorKind::ClientError),
        _ => Some(ErrorKind::ServerError),
    }
}

/// Builds the error for an already-interpreted error response.
#[must_use]
pub fn error_for_status(backend: Backend, status: u16, message: impl Into<String>) -> ProviderError {
    let message = message.into();
    match classify_status(status) {
        Some(ErrorKind::NotFound) => ProviderError::not_found(backend, message),
        Some(ErrorKind::Conflict) => ProviderError::conflict(backend, message),
        Some(ErrorKind::RateLimited) => ProviderError::rate_limited(backend, message),
        Some(ErrorKind::ServerError) => ProviderError::server(backend, status, message),
        Some(ErrorKind::ClientError) => ProviderError::client(backend, status, message),
        _ => ProviderError::unclassified(backend, Some(status), message),
    }
}

/// Classifies an error response from its status and raw body.
#[must_use]
pub fn classify_response(backend: Backend, status: u16, body: &[u8]) -> ProviderError {
    match ApiErrorBody::parse(body) {
        Some(parsed) => error_for_status(backend, status, parsed.message()),
        None if status >= 500 => ProviderError::server(backend, status, format!("HTTP {status}")),
        None => {
            let text = String::from_utf8_lossy(body);
            ProviderError::unclassified(backend, Some(status), format!("HTTP {status}: {}", text.trim()))
        }
    }
}

/// Classifies a failure that happened before any response was received.
#[must_use]
pub fn classify_transport(backend: Backend, error: &dyn fmt::Display) -> ProviderError {
    ProviderError::network(backend, error.to_string())
}
