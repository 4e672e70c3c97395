//! Per-pass cancellation.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use atlas_core::{Backend, ProviderError};

/// Context threaded through every remote call of one reconciliation pass.
///
/// Cancelling the token aborts the in-flight call; calls issued after
/// cancellation fail without reaching the backend.
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    token: CancellationToken,
}

impl ReconcileContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing token, typically a child of the driver's shutdown token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Runs a remote call, racing it against cancellation.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Cancelled` for `backend` if the context is
    /// cancelled before or while the call runs, otherwise the call's result.
    pub async fn run<T, F>(&self, backend: Backend, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        if self.token.is_cancelled() {
            return Err(ProviderError::cancelled(backend));
        }

        tokio::select! {
            biased;
            () = self.token.cancelled() => {
                tracing::debug!(%backend, "remote call cancelled");
                Err(ProviderError::cancelled(backend))
            }
            result = call => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_passes_result_through() {
        let ctx = ReconcileContext::new();
        let value = ctx
            .run(Backend::OrganizationApi, async { Ok::<_, ProviderError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_context_never_polls_call() {
        let ctx = ReconcileContext::new();
        ctx.cancel();
        let polled = std::sync::atomic::AtomicBool::new(false);
        let err = ctx
            .run(Backend::CredentialStore, async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, ProviderError>(())
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_call() {
        let ctx = ReconcileContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = ctx
            .run(Backend::OrganizationApi, std::future::pending::<Result<(), ProviderError>>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.is_retryable());
    }
}
