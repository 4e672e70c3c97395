//! Credential store backed by AWS Secrets Manager.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_kms::types::KeyState;
use aws_sdk_secretsmanager::types::Tag;

use atlas_core::{Backend, CredentialRecord, CredentialStore, ProviderError, SecretMetadata};

use crate::error::classify_sdk_error;

/// Recovery window applied when a deletion is not forced.
pub const RECOVERY_WINDOW_DAYS: i64 = 7;

/// Settings for [`SecretsManagerStore`].
#[derive(Debug, Clone)]
pub struct SecretsStoreConfig {
    /// AWS region holding the secrets.
    pub region: String,

    /// Endpoint override (LocalStack and similar).
    pub endpoint_url: Option<String>,

    /// Value of the `Provider` tag.
    pub provider_tag: String,

    /// Value of the `CreatedBy` tag.
    pub created_by: String,
}

impl SecretsStoreConfig {
    /// Creates a configuration for the given region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            provider_tag: "atlas-provider".to_string(),
            created_by: "atlas-organization-reconciler".to_string(),
        }
    }

    /// Sets an endpoint override.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }
}

/// [`CredentialStore`] over AWS Secrets Manager, with KMS key validation.
#[derive(Debug)]
pub struct SecretsManagerStore {
    secrets: aws_sdk_secretsmanager::Client,
    kms: aws_sdk_kms::Client,
    config: SecretsStoreConfig,
}

impl SecretsManagerStore {
    /// Loads AWS configuration from the environment and builds the store.
    pub async fn connect(config: SecretsStoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;

        tracing::info!(
            region = %config.region,
            endpoint_override = config.endpoint_url.is_some(),
            "AWS Secrets Manager credential store initialized"
        );

        Self {
            secrets: aws_sdk_secretsmanager::Client::new(&sdk_config),
            kms: aws_sdk_kms::Client::new(&sdk_config),
            config,
        }
    }

    /// Returns the region this store writes to.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.config.region
    }

    fn tags(&self, org_id: &str) -> Vec<Tag> {
        [
            ("Provider", self.config.provider_tag.as_str()),
            ("OrgID", org_id),
            ("CreatedBy", self.config.created_by.as_str()),
        ]
        .into_iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
    }
}

/// Description attached to a stored credential.
pub(crate) fn secret_description(org_id: &str) -> String {
    format!("API credentials for organization {org_id}")
}

fn encode(record: &CredentialRecord) -> Result<String, ProviderError> {
    serde_json::to_string(record)
        .map_err(|e| ProviderError::configuration(format!("cannot encode credential record: {e}")))
}

#[async_trait]
impl CredentialStore for SecretsManagerStore {
    async fn put(&self, name: &str, record: &CredentialRecord, key_ref: Option<&str>) -> Result<String, ProviderError> {
        let payload = encode(record)?;

        let created = self
            .secrets
            .create_secret()
            .name(name)
            .secret_string(&payload)
            .description(secret_description(&record.org_id))
            .set_tags(Some(self.tags(&record.org_id)))
            .set_kms_key_id(key_ref.map(str::to_string))
            .send()
            .await;

        match created {
            Ok(output) => {
                tracing::info!(secret_name = name, org_id = %record.org_id, "credential secret created");
                Ok(output.arn().unwrap_or(name).to_string())
            }
            Err(err) if err.as_service_error().is_some_and(|e| e.is_resource_exists_exception()) => {
                tracing::debug!(secret_name = name, "credential secret exists, overwriting value");
                let output = self
                    .secrets
                    .update_secret()
                    .secret_id(name)
                    .secret_string(&payload)
                    .set_kms_key_id(key_ref.map(str::to_string))
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(&e))?;
                tracing::info!(secret_name = name, org_id = %record.org_id, "credential secret updated");
                Ok(output.arn().unwrap_or(name).to_string())
            }
            Err(err) => Err(classify_sdk_error(&err)),
        }
    }

    async fn get(&self, name: &str) -> Result<CredentialRecord, ProviderError> {
        let output = self
            .secrets
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let value = output.secret_string().ok_or_else(|| {
            ProviderError::unclassified(
                Backend::CredentialStore,
                None,
                format!("secret {name} has no string value"),
            )
        })?;

        serde_json::from_str(value).map_err(|e| {
            ProviderError::unclassified(
                Backend::CredentialStore,
                None,
                format!("secret {name} is not a credential record: {e}"),
            )
        })
    }

    async fn describe(&self, name: &str) -> Result<SecretMetadata, ProviderError> {
        let output = self
            .secrets
            .describe_secret()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(SecretMetadata {
            name: output.name().unwrap_or(name).to_string(),
            location: output.arn().unwrap_or(name).to_string(),
            description: output.description().map(str::to_string),
            kms_key_id: output.kms_key_id().map(str::to_string),
        })
    }

    async fn delete(&self, name: &str, force_immediate: bool) -> Result<(), ProviderError> {
        let request = self.secrets.delete_secret().secret_id(name);
        let request = if force_immediate {
            request.force_delete_without_recovery(true)
        } else {
            request.recovery_window_in_days(RECOVERY_WINDOW_DAYS)
        };
        request.send().await.map_err(|e| classify_sdk_error(&e))?;

        tracing::info!(secret_name = name, force_immediate, "credential secret deleted");
        Ok(())
    }

    async fn validate_key(&self, key_ref: &str) -> Result<(), ProviderError> {
        let output = self.kms.describe_key().key_id(key_ref).send().await.map_err(|e| {
            let err = classify_sdk_error(&e);
            if err.is_not_found() {
                ProviderError::configuration(format!("encryption key {key_ref} does not exist"))
            } else {
                err
            }
        })?;

        match output.key_metadata().and_then(|metadata| metadata.key_state()) {
            Some(KeyState::Enabled) => Ok(()),
            state => Err(ProviderError::configuration(format!(
                "encryption key {key_ref} is not enabled (state: {state:?})"
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "aws-secrets-manager"
    }
}
