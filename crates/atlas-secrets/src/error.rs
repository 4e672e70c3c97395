//! Mapping of AWS SDK failures onto [`ProviderError`].

use aws_sdk_secretsmanager::config::http::HttpResponse;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use atlas_core::{Backend, ProviderError, classify_transport, error_for_status};

const BACKEND: Backend = Backend::CredentialStore;

/// Classifies an SDK error from either Secrets Manager or KMS.
pub(crate) fn classify_sdk_error<E>(err: &SdkError<E, HttpResponse>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let rendered = DisplayErrorContext(err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            return classify_transport(BACKEND, &rendered);
        }
        SdkError::ConstructionFailure(_) => {
            return ProviderError::configuration(format!("cannot build credential store request: {rendered}"));
        }
        _ => {}
    }

    let status = err.raw_response().map(|response| response.status().as_u16());
    let (code, message) = match err.as_service_error() {
        Some(service) => (
            service.code(),
            service.message().map_or_else(|| rendered.clone(), str::to_string),
        ),
        None => (None, rendered),
    };
    classify_service_code(code, status, message)
}

/// Maps an AWS error code (and the HTTP status as fallback) to a kind.
pub(crate) fn classify_service_code(code: Option<&str>, status: Option<u16>, message: String) -> ProviderError {
    match code {
        Some("ResourceNotFoundException" | "NotFoundException") => ProviderError::not_found(BACKEND, message),
        Some("ResourceExistsException") => ProviderError::conflict(BACKEND, message),
        // Secrets Manager rejects writes to a secret pending deletion.
        Some("InvalidRequestException") if message.contains("scheduled for deletion") => {
            ProviderError::conflict(BACKEND, message)
        }
        Some("ThrottlingException" | "TooManyRequestsException" | "RequestLimitExceeded") => {
            ProviderError::rate_limited(BACKEND, message)
        }
        Some("InternalServiceError" | "InternalFailure" | "ServiceUnavailable" | "KMSInternalException") => {
            ProviderError::server(BACKEND, status.unwrap_or(500), message)
        }
        _ => match status {
            Some(status) if status >= 400 => error_for_status(BACKEND, status, message),
            status => ProviderError::unclassified(BACKEND, status, message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::ErrorKind;

    #[test]
    fn test_service_codes() {
        let cases = [
            ("ResourceNotFoundException", 400, ErrorKind::NotFound),
            ("ResourceExistsException", 400, ErrorKind::Conflict),
            ("ThrottlingException", 400, ErrorKind::RateLimited),
            ("InternalServiceError", 500, ErrorKind::ServerError),
            ("AccessDeniedException", 400, ErrorKind::ClientError),
            ("NotFoundException", 400, ErrorKind::NotFound),
        ];
        for (code, status, expected) in cases {
            let err = classify_service_code(Some(code), Some(status), code.to_string());
            assert_eq!(err.kind(), expected, "{code}");
            assert_eq!(err.backend(), Some(Backend::CredentialStore));
        }
    }

    #[test]
    fn test_pending_deletion_is_conflict() {
        let err = classify_service_code(
            Some("InvalidRequestException"),
            Some(400),
            "You can't perform this operation on the secret because it was scheduled for deletion.".into(),
        );
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = classify_service_code(Some("InvalidRequestException"), Some(400), "bad parameter".into());
        assert_eq!(err.kind(), ErrorKind::ClientError);
    }

    #[test]
    fn test_unknown_code_falls_back_to_status() {
        assert_eq!(
            classify_service_code(None, Some(503), "unavailable".into()).kind(),
            ErrorKind::ServerError
        );
        assert_eq!(
            classify_service_code(None, None, "no response".into()).kind(),
            ErrorKind::Unclassified
        );
    }
}
