//! Contract between the driver and a resource kind's external client.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use atlas_core::{Outcome, ProviderError};

use crate::conditions::Conditions;
use crate::context::ReconcileContext;

/// Result of observing the remote objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalObservation {
    /// Whether the remote resource exists.
    pub resource_exists: bool,
    /// Whether the remote resource matches the desired spec.
    pub resource_up_to_date: bool,
}

impl ExternalObservation {
    #[must_use]
    pub fn absent() -> Self {
        Self {
            resource_exists: false,
            resource_up_to_date: false,
        }
    }

    #[must_use]
    pub fn present(up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
        }
    }
}

/// Credential material surfaced once, on creation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionDetails {
    pub public_key: String,
    pub private_key: String,
    /// Where the credential record was stored.
    pub location: String,
}

impl ConnectionDetails {
    /// Flattens the details into the key/value form drivers publish.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("publicKey", self.public_key.clone()),
            ("privateKey", self.private_key.clone()),
            ("secretLocation", self.location.clone()),
        ])
    }
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("location", &self.location)
            .finish()
    }
}

/// Result of a successful Create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCreation {
    pub external_id: String,
    pub connection_details: ConnectionDetails,
}

/// Result of a successful Update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalUpdate {
    /// Whether the credential record was rewritten.
    pub credential_rewritten: bool,
}

/// Progress of the two-phase deletion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionProgress {
    /// The finalizer token was recorded; no remote call was made.
    FinalizerRecorded,
    /// Remote cleanup finished and the token was removed.
    Completed,
}

/// A declared resource the driver can reconcile.
pub trait ManagedResource: Send {
    /// Logical name, for logging.
    fn name(&self) -> &str;

    fn is_deletion_requested(&self) -> bool;

    fn conditions_mut(&mut self) -> &mut Conditions;
}

/// Observe/Create/Update/Delete for one resource kind.
///
/// Implementations mutate the resource's status in place and leave it
/// untouched when they return an error before any remote mutation.
#[async_trait]
pub trait ExternalClient<R: ManagedResource>: Send + Sync {
    async fn observe(&self, ctx: &ReconcileContext, resource: &mut R) -> Outcome<ExternalObservation>;

    async fn create(&self, ctx: &ReconcileContext, resource: &mut R) -> Outcome<ExternalCreation>;

    async fn update(&self, ctx: &ReconcileContext, resource: &mut R) -> Result<ExternalUpdate, ProviderError>;

    async fn delete(&self, ctx: &ReconcileContext, resource: &mut R) -> Outcome<DeletionProgress>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_details_debug_is_redacted() {
        let details = ConnectionDetails {
            public_key: "pub".into(),
            private_key: "super-secret".into(),
            location: "ns/org-1/credentials".into(),
        };
        let rendered = format!("{details:?}");
        assert!(!rendered.contains("super-secret"));
        assert_eq!(details.to_map()["privateKey"], "super-secret");
    }
}
