//! In-memory credential store.

use std::sync::Arc;

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;

use atlas_core::{Backend, CredentialRecord, CredentialStore, ProviderError, SecretMetadata};

use crate::faults::{Operation, Recorder};

#[derive(Debug, Clone)]
struct StoredSecret {
    record: CredentialRecord,
    kms_key_id: Option<String>,
    scheduled_for_deletion: bool,
}

/// Credential store backed by a papaya map.
///
/// Records live at `{name}/credentials`. A non-forced delete schedules the
/// record for deletion instead of removing it; while scheduled it can be
/// described but neither read nor written.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    secrets: Arc<PapayaHashMap<String, StoredSecret>>,
    keys: Arc<PapayaHashMap<String, bool>>,
    recorder: Recorder,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an encryption key and whether it is enabled.
    #[must_use]
    pub fn with_key(self, key_ref: impl Into<String>, enabled: bool) -> Self {
        self.keys.pin().insert(key_ref.into(), enabled);
        self
    }

    /// Fault injection and call log.
    #[must_use]
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Location a record named `name` is stored at.
    #[must_use]
    pub fn location_of(name: &str) -> String {
        format!("{name}/credentials")
    }

    /// Returns the live record under `name`, bypassing fault injection.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<CredentialRecord> {
        self.secrets
            .pin()
            .get(name)
            .filter(|secret| !secret.scheduled_for_deletion)
            .map(|secret| secret.record.clone())
    }

    /// Returns `true` if a live record is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.record(name).is_some()
    }

    /// Returns `true` if `name` awaits deletion after its recovery window.
    #[must_use]
    pub fn is_scheduled_for_deletion(&self, name: &str) -> bool {
        self.secrets
            .pin()
            .get(name)
            .is_some_and(|secret| secret.scheduled_for_deletion)
    }

    /// Returns the encryption key a record was written with.
    #[must_use]
    pub fn kms_key_of(&self, name: &str) -> Option<String> {
        self.secrets.pin().get(name).and_then(|secret| secret.kms_key_id.clone())
    }

    /// Number of stored records, including scheduled ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.pin().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a record directly.
    pub fn insert(&self, name: impl Into<String>, record: CredentialRecord) {
        self.secrets.pin().insert(
            name.into(),
            StoredSecret {
                record,
                kms_key_id: None,
                scheduled_for_deletion: false,
            },
        );
    }

    /// Removes a record out of band.
    pub fn remove(&self, name: &str) -> Option<CredentialRecord> {
        self.secrets.pin().remove(name).map(|secret| secret.record.clone())
    }
}

fn not_found(name: &str) -> ProviderError {
    ProviderError::not_found(Backend::CredentialStore, format!("secret {name} not found"))
}

fn scheduled(name: &str) -> ProviderError {
    ProviderError::conflict(
        Backend::CredentialStore,
        format!("secret {name} is scheduled for deletion"),
    )
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn put(&self, name: &str, record: &CredentialRecord, key_ref: Option<&str>) -> Result<String, ProviderError> {
        self.recorder.enter(Operation::PutCredential, name).await?;

        let guard = self.secrets.pin();
        if guard.get(name).is_some_and(|secret| secret.scheduled_for_deletion) {
            return Err(scheduled(name));
        }
        guard.insert(
            name.to_string(),
            StoredSecret {
                record: record.clone(),
                kms_key_id: key_ref.map(str::to_string),
                scheduled_for_deletion: false,
            },
        );
        Ok(Self::location_of(name))
    }

    async fn get(&self, name: &str) -> Result<CredentialRecord, ProviderError> {
        self.recorder.enter(Operation::GetCredential, name).await?;

        match self.secrets.pin().get(name) {
            Some(secret) if secret.scheduled_for_deletion => Err(scheduled(name)),
            Some(secret) => Ok(secret.record.clone()),
            None => Err(not_found(name)),
        }
    }

    async fn describe(&self, name: &str) -> Result<SecretMetadata, ProviderError> {
        self.recorder.enter(Operation::DescribeCredential, name).await?;

        let guard = self.secrets.pin();
        let secret = guard.get(name).ok_or_else(|| not_found(name))?;
        Ok(SecretMetadata {
            name: name.to_string(),
            location: Self::location_of(name),
            description: Some(format!("API credentials for organization {}", secret.record.org_id)),
            kms_key_id: secret.kms_key_id.clone(),
        })
    }

    async fn delete(&self, name: &str, force_immediate: bool) -> Result<(), ProviderError> {
        self.recorder.enter(Operation::DeleteCredential, name).await?;

        let guard = self.secrets.pin();
        let secret = guard.get(name).cloned().ok_or_else(|| not_found(name))?;
        if force_immediate {
            guard.remove(name);
        } else if secret.scheduled_for_deletion {
            return Err(scheduled(name));
        } else {
            guard.insert(
                name.to_string(),
                StoredSecret {
                    scheduled_for_deletion: true,
                    ..secret
                },
            );
        }
        Ok(())
    }

    async fn validate_key(&self, key_ref: &str) -> Result<(), ProviderError> {
        self.recorder.enter(Operation::ValidateKey, key_ref).await?;

        match self.keys.pin().get(key_ref) {
            Some(true) => Ok(()),
            Some(false) => Err(ProviderError::configuration(format!(
                "encryption key {key_ref} is not enabled"
            ))),
            None => Err(ProviderError::configuration(format!(
                "encryption key {key_ref} does not exist"
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "in-memory-papaya"
    }
}
