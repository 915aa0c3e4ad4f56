use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Default `OpenAI` API base URL
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

/// API version sent to Azure-hosted backends when none is configured
pub const DEFAULT_API_VERSION: &str = "2023-07-01-preview";

/// Default number of chunks sent in a single embeddings request
pub const DEFAULT_MAX_EMBEDDING_BATCH_SIZE: usize = 128;

/// Configuration for the OpenAI-compatible backend
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL that endpoint paths are resolved against
    #[serde(default = "default_api_base")]
    pub api_base: Option<Url>,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// How the backend is hosted
    #[serde(default)]
    pub api_type: ApiType,
    /// Deployment name for deployment-keyed gateways
    #[serde(default)]
    pub deployment: Option<String>,
    /// `api-version` query value for Azure-hosted backends
    #[serde(default)]
    pub api_version: Option<String>,
    /// Model used for embeddings requests
    #[serde(default)]
    pub model: Option<String>,
    /// Prefer the legacy `completions` endpoint for models that allow it
    #[serde(default)]
    pub use_legacy_completions_endpoint: bool,
    /// Whether the backend serves the legacy `completions` endpoint at all
    #[serde(default = "default_true")]
    pub supports_completions: bool,
    /// Upper bound on the number of stop sequences sent upstream
    #[serde(default)]
    pub max_stop_words: Option<usize>,
    /// Maximum chunks per embeddings request
    #[serde(default = "default_max_embedding_batch_size")]
    pub max_embedding_batch_size: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            api_type: ApiType::default(),
            deployment: None,
            api_version: None,
            model: None,
            use_legacy_completions_endpoint: false,
            supports_completions: true,
            max_stop_words: None,
            max_embedding_batch_size: DEFAULT_MAX_EMBEDDING_BATCH_SIZE,
        }
    }
}

impl ProviderConfig {
    /// Configured `api-version`, falling back to [`DEFAULT_API_VERSION`]
    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
    }
}

/// Hosting mode of the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ApiType {
    /// Direct OpenAI-protocol endpoint
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Azure `OpenAI` keyed by deployment name
    #[serde(rename = "azure-openai")]
    AzureOpenAi,
    /// Older spelling of [`ApiType::AzureOpenAi`]
    #[serde(rename = "azure")]
    Azure,
    /// Azure-hosted backend addressed without a deployment path
    #[serde(rename = "azure-foundry")]
    AzureFoundry,
}

impl ApiType {
    /// Whether the backend is hosted on Azure in any form
    pub const fn is_azure(self) -> bool {
        !matches!(self, Self::OpenAi)
    }

    /// Whether endpoint paths are nested under `openai/deployments/{deployment}`
    pub const fn uses_deployment_path(self) -> bool {
        matches!(self, Self::AzureOpenAi | Self::Azure)
    }
}

#[allow(clippy::unnecessary_wraps)]
fn default_api_base() -> Option<Url> {
    Url::parse(DEFAULT_API_BASE).ok()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_embedding_batch_size() -> usize {
    DEFAULT_MAX_EMBEDDING_BATCH_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_openai() {
        let config: ProviderConfig = toml::from_str("").unwrap();
        assert_eq!(config.api_base.as_ref().unwrap().as_str(), DEFAULT_API_BASE);
        assert_eq!(config.api_type, ApiType::OpenAi);
        assert!(config.supports_completions);
        assert_eq!(config.max_embedding_batch_size, 128);
        assert_eq!(config.api_version(), "2023-07-01-preview");
    }

    #[test]
    fn azure_aliases_share_deployment_paths() {
        for raw in ["azure", "azure-openai"] {
            let config: ProviderConfig = toml::from_str(&format!("api_type = \"{raw}\"")).unwrap();
            assert!(config.api_type.uses_deployment_path(), "{raw}");
            assert!(config.api_type.is_azure());
        }
    }

    #[test]
    fn azure_foundry_keeps_verbatim_paths() {
        let config: ProviderConfig = toml::from_str("api_type = \"azure-foundry\"").unwrap();
        assert!(config.api_type.is_azure());
        assert!(!config.api_type.uses_deployment_path());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = toml::from_str::<ProviderConfig>("base_url = \"http://localhost\"");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_api_version_wins() {
        let config: ProviderConfig = toml::from_str("api_version = \"2024-10-21\"").unwrap();
        assert_eq!(config.api_version(), "2024-10-21");
    }
}
