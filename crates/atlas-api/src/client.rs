//! Organization API client over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use atlas_core::{
    ApiCredentials, ApiKeyDescriptor, Backend, CreateOrganizationInput, CreatedOrganization,
    Organization, OrganizationApi, OrganizationPatch, ProviderError, classify_response,
    classify_transport,
};

use crate::digest::DigestChallenge;

/// Default base URL of the public organization API.
pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com/api/atlas/v1.0";

const BACKEND: Backend = Backend::OrganizationApi;

/// Configuration for [`AtlasClient`].
#[derive(Debug, Clone)]
pub struct AtlasClientConfig {
    /// API base URL; resource paths are appended to it.
    pub base_url: String,

    /// HTTP request timeout (default: 30 seconds).
    pub request_timeout: Duration,
}

impl Default for AtlasClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AtlasClientConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrgPayload<'a> {
    name: &'a str,
    org_owner_id: &'a str,
    api_key: ApiKeyPayload<'a>,
}

#[derive(Serialize)]
struct ApiKeyPayload<'a> {
    desc: &'a str,
    roles: &'a [String],
}

impl<'a> From<&'a ApiKeyDescriptor> for ApiKeyPayload<'a> {
    fn from(descriptor: &'a ApiKeyDescriptor) -> Self {
        Self {
            desc: &descriptor.description,
            roles: &descriptor.roles,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrgResponse {
    api_key: IssuedKey,
    organization: Organization,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedKey {
    public_key: String,
    private_key: String,
}

/// Organization API client authenticated with an API key pair.
///
/// Every request is first sent without credentials; a digest challenge in a
/// `401` response is answered once.
pub struct AtlasClient {
    http_client: Client,
    base_url: Url,
    credentials: ApiCredentials,
}

impl AtlasClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::ConfigurationInvalid` if the base URL is not a
    /// valid http(s) URL or the HTTP client cannot be built.
    pub fn new(credentials: ApiCredentials, config: AtlasClientConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ProviderError::configuration(format!("invalid API base URL {}: {e}", config.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::configuration(format!(
                "API base URL must use http or https: {base_url}"
            )));
        }

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
        })
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        authorization: Option<String>,
    ) -> Result<Response, ProviderError> {
        let mut request = self
            .http_client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        request.send().await.map_err(|e| {
            tracing::warn!(%method, url, error = %e, "organization API request failed before a response");
            classify_transport(BACKEND, &e)
        })
    }

    /// Sends a request, answering a digest challenge if one is issued, and
    /// classifies error statuses.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ProviderError> {
        let url = self.endpoint(path);
        let mut response = self.dispatch(method.clone(), &url, body, None).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok())
                .and_then(DigestChallenge::parse);
            if let Some(challenge) = challenge {
                let uri = Url::parse(&url)
                    .map(|u| match u.query() {
                        Some(query) => format!("{}?{query}", u.path()),
                        None => u.path().to_string(),
                    })
                    .unwrap_or_else(|_| path.to_string());
                let authorization = challenge.authorize(method.as_str(), &uri, &self.credentials);
                response = self.dispatch(method.clone(), &url, body, Some(authorization)).await?;
            }
        }

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let bytes = response.bytes().await.unwrap_or_default();
            let err = classify_response(BACKEND, status.as_u16(), &bytes);
            tracing::debug!(%method, path, status = status.as_u16(), kind = %err.kind(), "organization API error response");
            return Err(err);
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let status = response.status().as_u16();
        response.json::<T>().await.map_err(|e| {
            ProviderError::unclassified(BACKEND, Some(status), format!("cannot decode response: {e}"))
        })
    }
}

fn require(value: &str, what: &str) -> Result<(), ProviderError> {
    if value.trim().is_empty() {
        return Err(ProviderError::configuration(format!("organization {what} cannot be empty")));
    }
    Ok(())
}

#[async_trait]
impl OrganizationApi for AtlasClient {
    async fn create(&self, input: &CreateOrganizationInput) -> Result<CreatedOrganization, ProviderError> {
        require(&input.name, "name")?;
        require(&input.owner_id, "owner id")?;

        let payload = serde_json::to_value(CreateOrgPayload {
            name: &input.name,
            org_owner_id: &input.owner_id,
            api_key: (&input.api_key).into(),
        })
        .map_err(|e| ProviderError::configuration(format!("cannot encode create payload: {e}")))?;

        let response = self.execute(Method::POST, "/orgs", Some(&payload)).await?;
        let created: CreateOrgResponse = Self::decode(response).await?;

        let mut organization = created.organization;
        if organization.owner_id.is_empty() {
            organization.owner_id.clone_from(&input.owner_id);
        }
        tracing::info!(org_id = %organization.id, name = %organization.name, "organization created");

        Ok(CreatedOrganization {
            organization,
            api_key: ApiCredentials::new(created.api_key.public_key, created.api_key.private_key),
        })
    }

    async fn get(&self, id: &str) -> Result<Organization, ProviderError> {
        require(id, "id")?;
        let response = self.execute(Method::GET, &format!("/orgs/{id}"), None).await?;
        Self::decode(response).await
    }

    async fn update(&self, id: &str, patch: &OrganizationPatch) -> Result<Organization, ProviderError> {
        require(id, "id")?;
        if patch.is_empty() {
            return self.get(id).await;
        }
        let payload = serde_json::to_value(patch)
            .map_err(|e| ProviderError::configuration(format!("cannot encode patch: {e}")))?;
        let response = self
            .execute(Method::PATCH, &format!("/orgs/{id}"), Some(&payload))
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        require(id, "id")?;
        self.execute(Method::DELETE, &format!("/orgs/{id}"), None).await?;
        tracing::info!(org_id = id, "organization deleted");
        Ok(())
    }
}
