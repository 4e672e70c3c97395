//! Collaborator contracts consumed by the reconciliation engine.
//!
//! Implementations must be thread-safe (`Send + Sync`) and must return
//! classified errors (see [`crate::classify`]). Cancellation is cooperative:
//! callers drop the returned future, so implementations must not hold
//! partially-applied local state across await points.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{
    CreateOrganizationInput, CreatedOrganization, CredentialRecord, Organization,
    OrganizationPatch, SecretMetadata,
};

/// Client for the external organization API.
///
/// # Example
///
/// ```ignore
/// use atlas_core::{OrganizationApi, ProviderError};
///
/// async fn exists(api: &dyn OrganizationApi, id: &str) -> Result<bool, ProviderError> {
///     match api.get(id).await {
///         Ok(org) => Ok(!org.is_deleted),
///         Err(err) if err.is_not_found() => Ok(false),
///         Err(err) => Err(err),
///     }
/// }
/// ```
#[async_trait]
pub trait OrganizationApi: Send + Sync {
    /// Creates an organization together with its first API key.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::ConfigurationInvalid` for an empty name or owner,
    /// otherwise a classified remote error.
    async fn create(&self, input: &CreateOrganizationInput) -> Result<CreatedOrganization, ProviderError>;

    /// Reads an organization by id.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if the organization does not exist.
    async fn get(&self, id: &str) -> Result<Organization, ProviderError>;

    /// Applies a patch to an organization.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if the organization does not exist.
    async fn update(&self, id: &str, patch: &OrganizationPatch) -> Result<Organization, ProviderError>;

    /// Deletes an organization.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if the organization is already gone.
    async fn delete(&self, id: &str) -> Result<(), ProviderError>;
}

/// Client for the external credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Writes a credential record, creating it or overwriting an existing one.
    ///
    /// Returns the location of the stored record.
    ///
    /// # Errors
    ///
    /// Returns a classified remote error; nothing is written on failure.
    async fn put(
        &self,
        name: &str,
        record: &CredentialRecord,
        key_ref: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Reads a credential record.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if no record is stored under `name`.
    async fn get(&self, name: &str) -> Result<CredentialRecord, ProviderError>;

    /// Reads metadata about a stored record without its value.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if no record is stored under `name`.
    async fn describe(&self, name: &str) -> Result<SecretMetadata, ProviderError>;

    /// Deletes a credential record, immediately or after the store's recovery window.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if no record is stored under `name`.
    async fn delete(&self, name: &str, force_immediate: bool) -> Result<(), ProviderError>;

    /// Checks that an encryption key reference is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or is not enabled.
    async fn validate_key(&self, key_ref: &str) -> Result<(), ProviderError>;

    /// Returns the name of this store for logging.
    fn backend_name(&self) -> &'static str;
}
