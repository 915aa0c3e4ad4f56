//! Programmatic provider configuration for integration tests

use conduit_config::{ApiType, ProviderConfig};
use conduit_llm::OpenAiAdapter;
use secrecy::SecretString;

/// API key every test adapter sends
pub const TEST_API_KEY: &str = "test-key";

/// Builder for adapter configurations pointed at a mock backend
pub struct ProviderBuilder {
    config: ProviderConfig,
}

impl ProviderBuilder {
    /// Standard deployment at `base_url` with the test key
    pub fn new(base_url: &str) -> Self {
        Self {
            config: ProviderConfig {
                api_base: Some(base_url.parse().expect("valid URL")),
                api_key: Some(SecretString::from(TEST_API_KEY)),
                ..ProviderConfig::default()
            },
        }
    }

    /// Azure hosting of the given flavour with a deployment name
    pub fn with_azure(mut self, api_type: ApiType, deployment: &str) -> Self {
        self.config.api_type = api_type;
        self.config.deployment = Some(deployment.to_owned());
        self
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        self.config.api_version = Some(version.to_owned());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = Some(model.to_owned());
        self
    }

    pub fn with_legacy_endpoint(mut self) -> Self {
        self.config.use_legacy_completions_endpoint = true;
        self
    }

    pub fn without_completions_support(mut self) -> Self {
        self.config.supports_completions = false;
        self
    }

    pub fn with_embedding_batch_size(mut self, size: usize) -> Self {
        self.config.max_embedding_batch_size = size;
        self
    }

    pub fn build(self) -> ProviderConfig {
        self.config
    }

    pub fn adapter(self) -> OpenAiAdapter {
        OpenAiAdapter::new(self.config)
    }
}
