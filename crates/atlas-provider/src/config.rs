use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use atlas_api::{AtlasClientConfig, DEFAULT_BASE_URL};
use atlas_core::DEFAULT_SECRET_NAMESPACE;
use atlas_reconciler::{CredentialSource, ProviderConfig, SecretsManagerRef};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "atlas-provider.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] ::config::ConfigError),

    #[error("validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub atlas: AtlasSettings,
    #[serde(default)]
    pub secrets: SecretsSettings,
    /// Named provider configurations referenced by resources.
    #[serde(default)]
    pub provider_configs: HashMap<String, ProviderConfigSettings>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        if self.atlas.base_url.trim().is_empty() {
            return Err(ConfigError::validation("atlas.base_url must not be empty"));
        }
        if self.atlas.request_timeout_ms == 0 {
            return Err(ConfigError::validation("atlas.request_timeout_ms must be > 0"));
        }
        Ok(())
    }

    /// Provider configurations in the form the connector consumes.
    #[must_use]
    pub fn provider_configs(&self) -> HashMap<String, ProviderConfig> {
        self.provider_configs
            .iter()
            .map(|(name, settings)| (name.clone(), settings.to_provider_config()))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Organization API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AtlasSettings {
    #[must_use]
    pub fn client_config(&self) -> AtlasClientConfig {
        AtlasClientConfig::new()
            .with_base_url(self.base_url.clone())
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
    }
}

/// Credential store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsSettings {
    /// Prefix of every credential key written by the provider.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Delete credentials immediately instead of scheduling them for deletion.
    #[serde(default = "default_force_delete")]
    pub force_delete: bool,
    /// Overrides the Secrets Manager endpoint, e.g. for a local emulator.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}
fn default_namespace() -> String {
    DEFAULT_SECRET_NAMESPACE.into()
}
fn default_force_delete() -> bool {
    true
}
impl Default for SecretsSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            force_delete: default_force_delete(),
            endpoint_url: None,
        }
    }
}

/// One `[provider_configs.<name>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfigSettings {
    /// Credential source; only `AWS` is usable.
    #[serde(default = "default_source")]
    pub source: String,
    /// Region of the root key secret.
    #[serde(default)]
    pub region: String,
    /// Name of the secret holding `publicKey` and `privateKey`.
    #[serde(default)]
    pub secret_name: String,
}
fn default_source() -> String {
    "AWS".into()
}

impl ProviderConfigSettings {
    /// Converts to the connector's model. Invalid settings are reported when a
    /// resource references them, not at load time.
    #[must_use]
    pub fn to_provider_config(&self) -> ProviderConfig {
        let source = match self.source.as_str() {
            "AWS" => CredentialSource::Aws,
            other => CredentialSource::Other(other.to_string()),
        };
        ProviderConfig {
            source,
            secrets_manager: Some(SecretsManagerRef {
                region: self.region.clone(),
                secret_name: self.secret_name.clone(),
            }),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError, DEFAULT_CONFIG_FILE};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Loads the file at `path` (or the default file if present), applies
    /// `ATLAS__SECTION__KEY` environment overrides and validates the result.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        } else if path.is_some() {
            return Err(ConfigError::validation(format!(
                "config file {} does not exist",
                pathbuf.display()
            )));
        }
        // e.g. ATLAS__SECRETS__FORCE_DELETE=false
        builder = builder.add_source(
            Environment::with_prefix("ATLAS")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.atlas.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.atlas.request_timeout_ms, 30_000);
        assert_eq!(config.secrets.namespace, "product/mongodb/");
        assert!(config.secrets.force_delete);
        assert!(config.provider_configs.is_empty());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = AppConfig::default();
        config.atlas.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.atlas.base_url = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_config_conversion() {
        let settings = ProviderConfigSettings {
            source: "AWS".into(),
            region: "eu-west-1".into(),
            secret_name: "atlas/root".into(),
        };
        assert_eq!(
            settings.to_provider_config(),
            ProviderConfig::aws("eu-west-1", "atlas/root")
        );

        let other = ProviderConfigSettings {
            source: "Vault".into(),
            ..settings
        };
        assert!(other.to_provider_config().root_secret().is_err());
    }
}
