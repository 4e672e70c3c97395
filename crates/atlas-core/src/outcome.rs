//! Results that separate the primary outcome of an operation from the
//! best-effort cleanup performed along the way.
//!
//! Secondary failures are logged when recorded and never replace the primary
//! result.

use std::fmt;

use crate::error::ProviderError;

/// A best-effort cleanup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanupAction {
    /// Delete an organization created earlier in the same operation.
    DeleteOrganization,
    /// Delete a credential record.
    DeleteCredential,
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteOrganization => write!(f, "delete-organization"),
            Self::DeleteCredential => write!(f, "delete-credential"),
        }
    }
}

/// Result of one cleanup step.
#[derive(Debug)]
pub struct SecondaryOutcome {
    /// What was attempted.
    pub action: CleanupAction,
    /// The remote object it was attempted on.
    pub target: String,
    /// `Err` holds a `ProviderError::CompensationFailed`.
    pub result: Result<(), ProviderError>,
}

impl SecondaryOutcome {
    /// Builds the outcome of a cleanup call.
    #[must_use]
    pub fn from_result(action: CleanupAction, target: impl Into<String>, result: Result<(), ProviderError>) -> Self {
        Self {
            action,
            target: target.into(),
            result: result.map_err(|err| ProviderError::compensation_failed(action, err)),
        }
    }

    /// Returns `true` if the cleanup failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Primary result plus any cleanup outcomes.
#[derive(Debug)]
#[must_use]
pub struct Outcome<T> {
    /// What the caller asked for.
    pub primary: Result<T, ProviderError>,
    /// Cleanup steps performed, in order.
    pub secondary: Vec<SecondaryOutcome>,
}

impl<T> Outcome<T> {
    /// Creates an outcome with no cleanup.
    pub fn new(primary: Result<T, ProviderError>) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
        }
    }

    /// Creates a successful outcome.
    pub fn ok(value: T) -> Self {
        Self::new(Ok(value))
    }

    /// Creates a failed outcome.
    pub fn err(error: ProviderError) -> Self {
        Self::new(Err(error))
    }

    /// Records a cleanup step, logging it if it failed.
    pub fn record(&mut self, secondary: SecondaryOutcome) {
        if let Err(err) = &secondary.result {
            tracing::warn!(
                action = %secondary.action,
                target = %secondary.target,
                error = %err,
                "best-effort cleanup failed"
            );
        }
        self.secondary.push(secondary);
    }

    /// Replaces the primary result, keeping recorded cleanup.
    pub fn with_primary<U>(self, primary: Result<U, ProviderError>) -> Outcome<U> {
        Outcome {
            primary,
            secondary: self.secondary,
        }
    }

    /// Returns `true` if the primary result is `Ok`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.primary.is_ok()
    }

    /// Iterates over failed cleanup steps.
    pub fn failed_cleanups(&self) -> impl Iterator<Item = &SecondaryOutcome> {
        self.secondary.iter().filter(|s| s.is_failure())
    }

    /// Returns the cleanup step for `action`, if one was attempted.
    #[must_use]
    pub fn cleanup(&self, action: CleanupAction) -> Option<&SecondaryOutcome> {
        self.secondary.iter().find(|s| s.action == action)
    }

    /// Discards cleanup outcomes and returns the primary result.
    ///
    /// # Errors
    ///
    /// Returns the primary error unchanged.
    pub fn into_result(self) -> Result<T, ProviderError> {
        self.primary
    }
}

impl<T> From<Result<T, ProviderError>> for Outcome<T> {
    fn from(primary: Result<T, ProviderError>) -> Self {
        Self::new(primary)
    }
}
