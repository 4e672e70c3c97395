//! Resolves a provider configuration into a bound [`OrganizationExternal`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use atlas_core::{
    ApiCredentials, Backend, DynCredentialStore, DynOrganizationApi, ProviderError, SecretNamer,
};

use crate::context::ReconcileContext;
use crate::organization::OrganizationExternal;
use crate::resource::OrganizationResource;

/// Where root credentials come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialSource {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(untagged)]
    Other(String),
}

/// Secrets Manager location of the root API key pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsManagerRef {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub secret_name: String,
}

/// A named provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub source: CredentialSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_manager: Option<SecretsManagerRef>,
}

impl ProviderConfig {
    /// Creates an AWS-sourced configuration.
    #[must_use]
    pub fn aws(region: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            source: CredentialSource::Aws,
            secrets_manager: Some(SecretsManagerRef {
                region: region.into(),
                secret_name: secret_name.into(),
            }),
        }
    }

    /// Returns the root secret reference if the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::ConfigurationInvalid` for a non-AWS source or a
    /// missing Secrets Manager block, region or secret name.
    pub fn root_secret(&self) -> Result<&SecretsManagerRef, ProviderError> {
        if self.source != CredentialSource::Aws {
            return Err(ProviderError::configuration(format!(
                "unsupported credential source {:?}, only AWS is supported",
                self.source
            )));
        }
        let secrets_manager = self
            .secrets_manager
            .as_ref()
            .ok_or_else(|| ProviderError::configuration("secretsManager block is required for the AWS source"))?;
        if secrets_manager.region.trim().is_empty() {
            return Err(ProviderError::configuration("secretsManager.region is required"));
        }
        if secrets_manager.secret_name.trim().is_empty() {
            return Err(ProviderError::configuration("secretsManager.secretName is required"));
        }
        Ok(secrets_manager)
    }
}

/// Looks up provider configurations by name.
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    async fn provider_config(&self, name: &str) -> Result<Option<ProviderConfig>, ProviderError>;
}

#[async_trait]
impl ProviderConfigSource for HashMap<String, ProviderConfig> {
    async fn provider_config(&self, name: &str) -> Result<Option<ProviderConfig>, ProviderError> {
        Ok(self.get(name).cloned())
    }
}

/// Builds backend clients. Injected so tests and alternative backends never
/// touch process-wide state.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Builds a credential store bound to `region`.
    async fn credential_store(&self, region: &str) -> Result<DynCredentialStore, ProviderError>;

    /// Builds an organization API client authenticated with `credentials`.
    fn organization_api(&self, credentials: ApiCredentials) -> Result<DynOrganizationApi, ProviderError>;
}

/// Produces an [`OrganizationExternal`] per reconciliation pass.
pub struct Connector {
    factory: Arc<dyn ClientFactory>,
    configs: Arc<dyn ProviderConfigSource>,
    namer: SecretNamer,
    force_delete: bool,
}

impl Connector {
    #[must_use]
    pub fn new(factory: Arc<dyn ClientFactory>, configs: Arc<dyn ProviderConfigSource>) -> Self {
        Self {
            factory,
            configs,
            namer: SecretNamer::default(),
            force_delete: true,
        }
    }

    #[must_use]
    pub fn with_namer(mut self, namer: SecretNamer) -> Self {
        self.namer = namer;
        self
    }

    #[must_use]
    pub fn with_force_delete(mut self, force_delete: bool) -> Self {
        self.force_delete = force_delete;
        self
    }

    /// Resolves the resource's provider configuration and builds its clients.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::ConfigurationInvalid` when the reference is
    /// missing or unknown, the configuration is unusable, or the root secret
    /// lacks a key pair; otherwise the classified error of reading the secret.
    pub async fn connect(
        &self,
        ctx: &ReconcileContext,
        resource: &OrganizationResource,
    ) -> Result<OrganizationExternal, ProviderError> {
        let config_name = resource
            .spec
            .provider_config_ref
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProviderError::configuration("spec.providerConfigRef is required"))?;

        let config = self
            .configs
            .provider_config(config_name)
            .await?
            .ok_or_else(|| ProviderError::configuration(format!("provider config {config_name} not found")))?;
        let root = config.root_secret()?;

        let root_store = self.factory.credential_store(&root.region).await?;
        let record = ctx
            .run(Backend::CredentialStore, root_store.get(&root.secret_name))
            .await?;
        let credentials = record.credentials();
        if credentials.public_key.is_empty() || credentials.private_key.is_empty() {
            return Err(ProviderError::configuration(format!(
                "secret {} must contain publicKey and privateKey",
                root.secret_name
            )));
        }

        let api = self.factory.organization_api(credentials)?;

        let placement_region = match resource.spec.for_provider.credential.region.trim() {
            "" => root.region.as_str(),
            region => region,
        };
        let store = if placement_region == root.region {
            root_store
        } else {
            self.factory.credential_store(placement_region).await?
        };

        tracing::debug!(
            resource = %resource.metadata.name,
            provider_config = config_name,
            region = placement_region,
            "connected"
        );

        Ok(OrganizationExternal::new(api, store, self.namer.clone()).with_force_delete(self.force_delete))
    }
}
