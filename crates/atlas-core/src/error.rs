//! Error types shared by every backend client and the reconciliation engine.
//!
//! Each remote call outcome is reduced to a [`ProviderError`]; its
//! [`ErrorKind`] decides whether the driver retries or reports a persistent
//! failure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::CleanupAction;

/// The remote system an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// The organization API.
    OrganizationApi,
    /// The credential store holding the organization API keys.
    CredentialStore,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrganizationApi => write!(f, "organization-api"),
            Self::CredentialStore => write!(f, "credential-store"),
        }
    }
}

/// Errors produced by the backend clients and the engine.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The addressed remote object does not exist.
    #[error("{backend}: resource not found: {message}")]
    NotFound {
        /// Backend that reported the error.
        backend: Backend,
        /// Remote error detail.
        message: String,
    },

    /// The remote object is mid-transition or was modified concurrently.
    #[error("{backend}: conflict (resource in transition): {message}")]
    Conflict {
        /// Backend that reported the error.
        backend: Backend,
        /// Remote error detail.
        message: String,
    },

    /// The backend throttled the request.
    #[error("{backend}: rate limited: {message}")]
    RateLimited {
        /// Backend that reported the error.
        backend: Backend,
        /// Remote error detail.
        message: String,
    },

    /// The backend failed with a 5xx status.
    #[error("{backend}: server error (HTTP {status}): {message}")]
    Server {
        /// Backend that reported the error.
        backend: Backend,
        /// HTTP status received.
        status: u16,
        /// Remote error detail.
        message: String,
    },

    /// The request was malformed or unauthorized.
    #[error("{backend}: request rejected (HTTP {status}): {message}")]
    Client {
        /// Backend that reported the error.
        backend: Backend,
        /// HTTP status received.
        status: u16,
        /// Remote error detail.
        message: String,
    },

    /// The request failed before a response was received.
    #[error("{backend}: network error: {message}")]
    Network {
        /// Backend the request was addressed to.
        backend: Backend,
        /// Transport error detail.
        message: String,
    },

    /// The caller cancelled the operation while a remote call was in flight.
    #[error("{backend}: operation cancelled")]
    Cancelled {
        /// Backend the cancelled request was addressed to.
        backend: Backend,
    },

    /// A failure that could not be classified (unparsable error body, undecodable payload).
    #[error("{backend}: unclassified error: {message}")]
    Unclassified {
        /// Backend that reported the error.
        backend: Backend,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Error detail.
        message: String,
    },

    /// Required declared fields are missing or provider configuration is unusable.
    #[error("invalid configuration: {message}")]
    ConfigurationInvalid {
        /// What is missing or wrong.
        message: String,
    },

    /// The stored credential disappeared while its organization still exists.
    #[error("credential {name} is missing and cannot be rebuilt without recreating the organization")]
    CredentialLost {
        /// Credential-store key of the missing record.
        name: String,
    },

    /// A best-effort cleanup step failed.
    #[error("compensating action {action} failed: {source}")]
    CompensationFailed {
        /// The cleanup that was attempted.
        action: CleanupAction,
        /// Why it failed.
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(backend: Backend, message: impl Into<String>) -> Self {
        Self::NotFound {
            backend,
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(backend: Backend, message: impl Into<String>) -> Self {
        Self::Conflict {
            backend,
            message: message.into(),
        }
    }

    /// Creates a new `RateLimited` error.
    #[must_use]
    pub fn rate_limited(backend: Backend, message: impl Into<String>) -> Self {
        Self::RateLimited {
            backend,
            message: message.into(),
        }
    }

    /// Creates a new `Server` error.
    #[must_use]
    pub fn server(backend: Backend, status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            backend,
            status,
            message: message.into(),
        }
    }

    /// Creates a new `Client` error.
    #[must_use]
    pub fn client(backend: Backend, status: u16, message: impl Into<String>) -> Self {
        Self::Client {
            backend,
            status,
            message: message.into(),
        }
    }

    /// Creates a new `Network` error.
    #[must_use]
    pub fn network(backend: Backend, message: impl Into<String>) -> Self {
        Self::Network {
            backend,
            message: message.into(),
        }
    }

    /// Creates a new `Cancelled` error.
    #[must_use]
    pub fn cancelled(backend: Backend) -> Self {
        Self::Cancelled { backend }
    }

    /// Creates a new `Unclassified` error.
    #[must_use]
    pub fn unclassified(backend: Backend, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Unclassified {
            backend,
            status,
            message: message.into(),
        }
    }

    /// Creates a new `ConfigurationInvalid` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            message: message.into(),
        }
    }

    /// Creates a new `CredentialLost` error.
    #[must_use]
    pub fn credential_lost(name: impl Into<String>) -> Self {
        Self::CredentialLost { name: name.into() }
    }

    /// Wraps a cleanup failure.
    #[must_use]
    pub fn compensation_failed(action: CleanupAction, source: ProviderError) -> Self {
        Self::CompensationFailed {
            action,
            source: Box::new(source),
        }
    }

    /// Returns the semantic kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Server { .. } => ErrorKind::ServerError,
            Self::Client { .. } | Self::CredentialLost { .. } => ErrorKind::ClientError,
            Self::Network { .. } | Self::Cancelled { .. } => ErrorKind::NetworkError,
            Self::Unclassified { .. } => ErrorKind::Unclassified,
            Self::ConfigurationInvalid { .. } => ErrorKind::ConfigurationInvalid,
            Self::CompensationFailed { .. } => ErrorKind::CompensationFailed,
        }
    }

    /// Returns `true` if the driver should re-invoke the operation later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the operation was cancelled by the caller.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the backend that produced this error, if any.
    #[must_use]
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Self::NotFound { backend, .. }
            | Self::Conflict { backend, .. }
            | Self::RateLimited { backend, .. }
            | Self::Server { backend, .. }
            | Self::Client { backend, .. }
            | Self::Network { backend, .. }
            | Self::Cancelled { backend }
            | Self::Unclassified { backend, .. } => Some(*backend),
            Self::CompensationFailed { source, .. } => source.backend(),
            Self::ConfigurationInvalid { .. } | Self::CredentialLost { .. } => None,
        }
    }

    /// Returns the HTTP status that was received, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Client { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::RateLimited { .. } => Some(429),
            Self::Unclassified { status, .. } => *status,
            _ => None,
        }
    }
}

/// Semantic classification of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Remote object absent.
    NotFound,
    /// Remote object mid-transition or concurrently modified.
    Conflict,
    /// Backend throttling.
    RateLimited,
    /// Backend failure (5xx).
    ServerError,
    /// Malformed or unauthorized request.
    ClientError,
    /// Transport failure or cancellation before a response.
    NetworkError,
    /// Error response without a parsable body and a non-5xx status.
    Unclassified,
    /// Best-effort cleanup failed.
    CompensationFailed,
    /// Declared or provider configuration is unusable.
    ConfigurationInvalid,
}

impl ErrorKind {
    /// Returns `true` for kinds the driver's backoff should retry.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::NotFound
                | Self::Conflict
                | Self::RateLimited
                | Self::ServerError
                | Self::NetworkError
        )
    }

    /// Returns `true` for kinds that will not succeed without operator intervention.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_retryable()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ServerError => write!(f, "server_error"),
            Self::ClientError => write!(f, "client_error"),
            Self::NetworkError => write!(f, "network_error"),
            Self::Unclassified => write!(f, "unclassified"),
            Self::CompensationFailed => write!(f, "compensation_failed"),
            Self::ConfigurationInvalid => write!(f, "configuration_invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::not_found(Backend::OrganizationApi, "org-42");
        assert_eq!(
            err.to_string(),
            "organization-api: resource not found: org-42"
        );

        let err = ProviderError::server(Backend::CredentialStore, 503, "unavailable");
        assert_eq!(
            err.to_string(),
            "credential-store: server error (HTTP 503): unavailable"
        );

        let err = ProviderError::configuration("owner id is required");
        assert_eq!(err.to_string(), "invalid configuration: owner id is required");
    }

    #[test]
    fn test_retryable_kinds() {
        let retryable = [
            ProviderError::not_found(Backend::OrganizationApi, ""),
            ProviderError::conflict(Backend::OrganizationApi, ""),
            ProviderError::rate_limited(Backend::OrganizationApi, ""),
            ProviderError::server(Backend::OrganizationApi, 500, ""),
            ProviderError::network(Backend::OrganizationApi, "connection reset"),
            ProviderError::cancelled(Backend::CredentialStore),
        ];
        for err in &retryable {
            assert!(err.is_retryable(), "{err} should be retryable");
        }

        let terminal = [
            ProviderError::client(Backend::OrganizationApi, 401, "unauthorized"),
            ProviderError::unclassified(Backend::OrganizationApi, Some(418), "teapot"),
            ProviderError::configuration("missing name"),
            ProviderError::credential_lost("product/mongodb/acme"),
        ];
        for err in &terminal {
            assert!(!err.is_retryable(), "{err} should be terminal");
        }
    }

    #[test]
    fn test_cancellation_is_network_kind() {
        let err = ProviderError::cancelled(Backend::OrganizationApi);
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_compensation_failed_keeps_source() {
        let err = ProviderError::compensation_failed(
            CleanupAction::DeleteOrganization,
            ProviderError::server(Backend::OrganizationApi, 502, "bad gateway"),
        );
        assert_eq!(err.kind(), ErrorKind::CompensationFailed);
        assert_eq!(err.backend(), Some(Backend::OrganizationApi));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(
            ProviderError::not_found(Backend::CredentialStore, "").status(),
            Some(404)
        );
        assert_eq!(
            ProviderError::network(Backend::CredentialStore, "").status(),
            None
        );
    }
}
