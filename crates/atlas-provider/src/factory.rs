//! Default wiring of the HTTP organization client and the Secrets Manager store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;

use atlas_api::{AtlasClient, AtlasClientConfig};
use atlas_core::{ApiCredentials, DynCredentialStore, DynOrganizationApi, ProviderError, SecretNamer};
use atlas_reconciler::{ClientFactory, Connector, ProviderConfig};
use atlas_secrets::{SecretsManagerStore, SecretsStoreConfig};

use crate::config::AppConfig;

/// Builds [`AtlasClient`]s per root key and caches one Secrets Manager store
/// per region.
pub struct DefaultClientFactory {
    atlas: AtlasClientConfig,
    endpoint_url: Option<String>,
    stores: PapayaHashMap<String, DynCredentialStore>,
}

impl DefaultClientFactory {
    #[must_use]
    pub fn new(atlas: AtlasClientConfig) -> Self {
        Self {
            atlas,
            endpoint_url: None,
            stores: PapayaHashMap::new(),
        }
    }

    /// Points every store at a custom Secrets Manager endpoint.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let factory = Self::new(config.atlas.client_config());
        match &config.secrets.endpoint_url {
            Some(endpoint_url) => factory.with_endpoint_url(endpoint_url.clone()),
            None => factory,
        }
    }
}

#[async_trait]
impl ClientFactory for DefaultClientFactory {
    async fn credential_store(&self, region: &str) -> Result<DynCredentialStore, ProviderError> {
        if region.trim().is_empty() {
            return Err(ProviderError::configuration("credential store region is required"));
        }
        let cached = self.stores.pin().get(region).cloned();
        if let Some(store) = cached {
            return Ok(store);
        }

        let mut store_config = SecretsStoreConfig::new(region);
        if let Some(endpoint_url) = &self.endpoint_url {
            store_config = store_config.with_endpoint_url(endpoint_url.clone());
        }
        let store: DynCredentialStore = Arc::new(SecretsManagerStore::connect(store_config).await);
        tracing::debug!(region, "credential store client created");

        // Concurrent passes may race here. The first insert wins.
        Ok(self
            .stores
            .pin()
            .get_or_insert(region.to_string(), store)
            .clone())
    }

    fn organization_api(&self, credentials: ApiCredentials) -> Result<DynOrganizationApi, ProviderError> {
        let client = AtlasClient::new(credentials, self.atlas.clone())?;
        Ok(Arc::new(client))
    }
}

/// Assembles a [`Connector`] from application configuration.
#[must_use]
pub fn build_connector(config: &AppConfig) -> Connector {
    let configs: HashMap<String, ProviderConfig> = config.provider_configs();
    tracing::info!(
        provider_configs = configs.len(),
        namespace = %config.secrets.namespace,
        force_delete = config.secrets.force_delete,
        "connector configured"
    );
    Connector::new(Arc::new(DefaultClientFactory::from_config(config)), Arc::new(configs))
        .with_namer(SecretNamer::new(config.secrets.namespace.clone()))
        .with_force_delete(config.secrets.force_delete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::ErrorKind;

    #[test]
    fn test_organization_api_rejects_bad_base_url() {
        let factory = DefaultClientFactory::new(AtlasClientConfig::new().with_base_url("ftp://example.com"));
        let err = factory
            .organization_api(ApiCredentials::new("pub", "priv"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);

        let factory = DefaultClientFactory::new(AtlasClientConfig::new());
        assert!(factory.organization_api(ApiCredentials::new("pub", "priv")).is_ok());
    }

    #[tokio::test]
    async fn test_blank_region_is_rejected() {
        let factory = DefaultClientFactory::new(AtlasClientConfig::new());
        let err = factory.credential_store(" ").await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    }
}
