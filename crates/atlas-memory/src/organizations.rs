//! In-memory organization API.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use uuid::Uuid;

use atlas_core::{
    ApiCredentials, Backend, CreateOrganizationInput, CreatedOrganization, Organization,
    OrganizationApi, OrganizationPatch, ProviderError,
};

use crate::faults::{Operation, Recorder};

/// Organization API backed by a papaya map.
///
/// Ids are assigned deterministically as `org-{n}`, starting at 1 unless
/// configured otherwise, so tests can predict them.
#[derive(Debug)]
pub struct InMemoryOrganizationApi {
    organizations: Arc<PapayaHashMap<String, Organization>>,
    next_id: AtomicU64,
    recorder: Recorder,
}

impl Default for InMemoryOrganizationApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrganizationApi {
    /// Creates an empty API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_first_id(1)
    }

    /// Creates an empty API whose first organization gets `org-{first}`.
    #[must_use]
    pub fn with_first_id(first: u64) -> Self {
        Self {
            organizations: Arc::new(PapayaHashMap::new()),
            next_id: AtomicU64::new(first),
            recorder: Recorder::default(),
        }
    }

    /// Fault injection and call log.
    #[must_use]
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Returns the organization with `id`, bypassing fault injection.
    #[must_use]
    pub fn organization(&self, id: &str) -> Option<Organization> {
        self.organizations.pin().get(id).cloned()
    }

    /// Returns `true` if an organization with `id` is stored.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.organizations.pin().contains_key(id)
    }

    /// Number of stored organizations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.organizations.pin().len()
    }

    /// Returns `true` if no organizations are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores an organization directly.
    pub fn insert(&self, organization: Organization) {
        self.organizations.pin().insert(organization.id.clone(), organization);
    }

    /// Removes an organization out of band, as if deleted by someone else.
    pub fn remove(&self, id: &str) -> Option<Organization> {
        self.organizations.pin().remove(id).cloned()
    }

    /// Flags an organization as soft-deleted.
    pub fn mark_deleted(&self, id: &str) {
        let guard = self.organizations.pin();
        if let Some(existing) = guard.get(id) {
            let mut organization = existing.clone();
            organization.is_deleted = true;
            guard.insert(id.to_string(), organization);
        }
    }

    fn next_id(&self) -> String {
        format!("org-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

fn not_found(id: &str) -> ProviderError {
    ProviderError::not_found(Backend::OrganizationApi, format!("organization {id} not found"))
}

#[async_trait]
impl OrganizationApi for InMemoryOrganizationApi {
    async fn create(&self, input: &CreateOrganizationInput) -> Result<CreatedOrganization, ProviderError> {
        self.recorder.enter(Operation::CreateOrganization, &input.name).await?;

        if input.name.trim().is_empty() {
            return Err(ProviderError::configuration("organization name cannot be empty"));
        }
        if input.owner_id.trim().is_empty() {
            return Err(ProviderError::configuration("organization owner id cannot be empty"));
        }

        let organization = Organization {
            id: self.next_id(),
            name: input.name.clone(),
            owner_id: input.owner_id.clone(),
            is_deleted: false,
        };
        let public_key = Uuid::new_v4().simple().to_string()[..8].to_string();
        let api_key = ApiCredentials::new(public_key, Uuid::new_v4().to_string());

        self.organizations
            .pin()
            .insert(organization.id.clone(), organization.clone());

        Ok(CreatedOrganization { organization, api_key })
    }

    async fn get(&self, id: &str) -> Result<Organization, ProviderError> {
        self.recorder.enter(Operation::GetOrganization, id).await?;
        self.organization(id).ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: &str, patch: &OrganizationPatch) -> Result<Organization, ProviderError> {
        self.recorder.enter(Operation::UpdateOrganization, id).await?;

        let guard = self.organizations.pin();
        let mut organization = guard.get(id).cloned().ok_or_else(|| not_found(id))?;
        if let Some(name) = patch.name.as_deref().filter(|name| !name.is_empty()) {
            organization.name = name.to_string();
        }
        guard.insert(id.to_string(), organization.clone());
        Ok(organization)
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        self.recorder.enter(Operation::DeleteOrganization, id).await?;
        self.organizations
            .pin()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}
