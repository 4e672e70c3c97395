//! Data exchanged with the organization API and the credential store.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Descriptor of the API key issued together with a new organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyDescriptor {
    /// Free-form key description.
    #[serde(default)]
    pub description: String,
    /// Roles granted to the key (e.g. `ORG_OWNER`).
    #[serde(default)]
    pub roles: Vec<String>,
}

impl ApiKeyDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(description: impl Into<String>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            description: description.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Public/private API key pair.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCredentials {
    /// Public key, used as the digest username.
    pub public_key: String,
    /// Private key, used as the digest password.
    pub private_key: String,
}

impl ApiCredentials {
    /// Creates a new key pair.
    #[must_use]
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// An organization as reported by the organization API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Organization {
    /// Identifier assigned by the API.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owner user id.
    #[serde(rename = "orgOwnerId", skip_serializing_if = "String::is_empty")]
    pub owner_id: String,
    /// Set by the API once the organization has been soft-deleted.
    pub is_deleted: bool,
}

/// Input for creating an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrganizationInput {
    /// Organization name.
    pub name: String,
    /// Owner user id.
    pub owner_id: String,
    /// Initial API key to issue.
    pub api_key: ApiKeyDescriptor,
}

/// Result of creating an organization: the organization and its first key pair.
#[derive(Debug, Clone)]
pub struct CreatedOrganization {
    /// The new organization.
    pub organization: Organization,
    /// Key pair issued at creation. This is the only time the private key is returned.
    pub api_key: ApiCredentials,
}

/// Mutable organization fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl OrganizationPatch {
    /// Returns `true` when the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.as_deref().is_none_or(str::is_empty)
    }
}

/// The record kept in the credential store for one organization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// API public key.
    pub public_key: String,
    /// API private key.
    pub private_key: String,
    /// Key description.
    #[serde(default)]
    pub description: String,
    /// Owning organization id.
    #[serde(default)]
    pub org_id: String,
    /// Roles granted to the key.
    #[serde(default)]
    pub roles: Vec<String>,
    /// When the record was first written. Root key secrets written by hand
    /// usually lack it.
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    pub created_at: OffsetDateTime,
}

impl CredentialRecord {
    /// Builds the record for a freshly created organization.
    #[must_use]
    pub fn issued(org_id: impl Into<String>, key: &ApiCredentials, descriptor: &ApiKeyDescriptor) -> Self {
        Self {
            public_key: key.public_key.clone(),
            private_key: key.private_key.clone(),
            description: descriptor.description.clone(),
            org_id: org_id.into(),
            roles: descriptor.roles.clone(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns the key pair held by this record.
    #[must_use]
    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials::new(&self.public_key, &self.private_key)
    }

    /// Returns `true` when description and roles match the descriptor.
    #[must_use]
    pub fn matches(&self, descriptor: &ApiKeyDescriptor) -> bool {
        self.description == descriptor.description && self.roles == descriptor.roles
    }

    /// Copies descriptive fields from the descriptor, keeping the key material.
    pub fn merge(&mut self, descriptor: &ApiKeyDescriptor) {
        self.description.clone_from(&descriptor.description);
        self.roles.clone_from(&descriptor.roles);
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("description", &self.description)
            .field("org_id", &self.org_id)
            .field("roles", &self.roles)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Metadata describing a stored credential, without its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMetadata {
    /// Credential-store key.
    pub name: String,
    /// Store-assigned location (an ARN for AWS Secrets Manager).
    pub location: String,
    /// Description attached to the secret.
    pub description: Option<String>,
    /// Encryption key protecting the secret.
    pub kms_key_id: Option<String>,
}
