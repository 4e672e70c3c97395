//! The declared Organization resource: desired spec plus engine-owned status.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use atlas_core::ApiKeyDescriptor;

use crate::conditions::Conditions;

/// Coarse lifecycle of the paired (organization, credential) entity.
///
/// Informational only; the remote systems are authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Absent,
    Creating,
    Available,
    Deleting,
    Deleted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Creating => write!(f, "Creating"),
            Self::Available => write!(f, "Available"),
            Self::Deleting => write!(f, "Deleting"),
            Self::Deleted => write!(f, "Deleted"),
        }
    }
}

/// What happens to the remote objects when the declared resource is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeletionPolicy {
    /// Delete the organization and its credential.
    #[default]
    Delete,
    /// Leave both remote objects in place.
    Orphan,
}

/// Where the organization's credential is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPlacement {
    /// Credential-store region.
    #[serde(default)]
    pub region: String,
    /// Explicit key name, prefixed with the store namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    /// Encryption key to protect the record with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

/// Desired state of the organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationParameters {
    /// Organization display name.
    pub name: String,
    /// Owner user id.
    pub owner_id: String,
    /// Initial API key.
    #[serde(default)]
    pub api_key: ApiKeyDescriptor,
    /// Credential placement.
    #[serde(default)]
    pub credential: CredentialPlacement,
}

/// Operator-declared spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSpec {
    pub for_provider: OrganizationParameters,
    /// Name of the provider configuration holding the root API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<String>,
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// Status fields owned by the engine and persisted by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedStatus {
    /// Organization id; empty until created.
    #[serde(default)]
    pub external_id: String,
    /// Organization name last reported by the API.
    #[serde(default)]
    pub organization_name: String,
    /// Credential-store key; empty until stored.
    #[serde(default)]
    pub credential_name: String,
    /// Store-assigned location of the credential.
    #[serde(default)]
    pub credential_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_ref: Option<String>,
    /// Descriptor last written to the credential store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_credential: Option<ApiKeyDescriptor>,
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    /// Cooperative finalizer token; gates remote deletion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_marker: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

impl ObservedStatus {
    /// Returns `true` once the organization has been created.
    #[must_use]
    pub fn has_external_id(&self) -> bool {
        !self.external_id.is_empty()
    }

    /// Forgets both remote objects.
    pub(crate) fn clear_remote_identity(&mut self) {
        self.external_id.clear();
        self.organization_name.clear();
        self.credential_name.clear();
        self.credential_location.clear();
        self.encryption_key_ref = None;
        self.applied_credential = None;
    }
}

/// Full status: observed fields plus conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStatus {
    #[serde(default)]
    pub at_provider: ObservedStatus,
    #[serde(default)]
    pub conditions: Conditions,
}

/// Resource metadata the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Logical name of the declared resource.
    pub name: String,
    /// Set by the control plane once deletion has been requested.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub deletion_timestamp: Option<OffsetDateTime>,
}

/// A declared Organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResource {
    pub metadata: ObjectMeta,
    pub spec: OrganizationSpec,
    #[serde(default)]
    pub status: OrganizationStatus,
}

impl OrganizationResource {
    /// Creates a resource with the given logical name and parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, for_provider: OrganizationParameters) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                deletion_timestamp: None,
            },
            spec: OrganizationSpec {
                for_provider,
                ..OrganizationSpec::default()
            },
            status: OrganizationStatus::default(),
        }
    }

    /// Sets the provider configuration reference.
    #[must_use]
    pub fn with_provider_config(mut self, name: impl Into<String>) -> Self {
        self.spec.provider_config_ref = Some(name.into());
        self
    }

    /// Sets the deletion policy.
    #[must_use]
    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.spec.deletion_policy = policy;
        self
    }

    /// Marks the resource for deletion, as the control plane would.
    pub fn request_deletion(&mut self) {
        if self.metadata.deletion_timestamp.is_none() {
            self.metadata.deletion_timestamp = Some(OffsetDateTime::now_utc());
        }
    }

    /// Returns `true` once deletion has been requested.
    #[must_use]
    pub fn is_deletion_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Shorthand for `status.at_provider`.
    #[must_use]
    pub fn observed(&self) -> &ObservedStatus {
        &self.status.at_provider
    }
}
