//! Fault injection and call recording shared by the in-memory backends.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use atlas_core::ProviderError;

/// A remote operation exposed by one of the fakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateOrganization,
    GetOrganization,
    UpdateOrganization,
    DeleteOrganization,
    PutCredential,
    GetCredential,
    DescribeCredential,
    DeleteCredential,
    ValidateKey,
}

impl Operation {
    /// Returns `true` for operations that change remote state.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::CreateOrganization
                | Self::UpdateOrganization
                | Self::DeleteOrganization
                | Self::PutCredential
                | Self::DeleteCredential
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateOrganization => "organization.create",
            Self::GetOrganization => "organization.get",
            Self::UpdateOrganization => "organization.update",
            Self::DeleteOrganization => "organization.delete",
            Self::PutCredential => "credential.put",
            Self::GetCredential => "credential.get",
            Self::DescribeCredential => "credential.describe",
            Self::DeleteCredential => "credential.delete",
            Self::ValidateKey => "credential.validate_key",
        };
        f.write_str(name)
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    /// Organization id, organization name or credential key the call addressed.
    pub target: String,
}

enum Fault {
    Fail(ProviderError),
    /// Never completes; used to exercise cancellation.
    Hang,
}

/// Per-operation queues of injected faults plus a log of every call.
#[derive(Default)]
pub struct Recorder {
    faults: Mutex<HashMap<Operation, VecDeque<Fault>>>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Recorder {
    /// Makes the next call of `operation` fail with `error`.
    ///
    /// Faults queue up: calling this twice fails the next two calls.
    pub fn fail_next(&self, operation: Operation, error: ProviderError) {
        lock(&self.faults)
            .entry(operation)
            .or_default()
            .push_back(Fault::Fail(error));
    }

    /// Makes the next call of `operation` hang until its future is dropped.
    pub fn hang_next(&self, operation: Operation) {
        lock(&self.faults).entry(operation).or_default().push_back(Fault::Hang);
    }

    /// Drops all pending faults.
    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    /// Returns every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Counts recorded calls of `operation`.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Counts recorded calls that change remote state.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.operation.is_mutation())
            .count()
    }

    /// Forgets recorded calls.
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Records a call and applies the next queued fault, if any.
    pub(crate) async fn enter(&self, operation: Operation, target: &str) -> Result<(), ProviderError> {
        lock(&self.calls).push(Call {
            operation,
            target: target.to_string(),
        });

        let fault = lock(&self.faults)
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);

        match fault {
            None => Ok(()),
            Some(Fault::Fail(error)) => {
                tracing::debug!(%operation, target, error = %error, "injected fault");
                Err(error)
            }
            Some(Fault::Hang) => std::future::pending().await,
        }
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("calls", &lock(&self.calls).len())
            .finish_non_exhaustive()
    }
}
