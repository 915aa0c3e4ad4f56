use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if a placeholder cannot be expanded, TOML parsing
    /// fails, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_api_base()?;
        self.validate_deployment()?;

        if self.provider.max_embedding_batch_size == 0 {
            anyhow::bail!("provider.max_embedding_batch_size must be greater than 0");
        }

        Ok(())
    }

    fn validate_api_base(&self) -> anyhow::Result<()> {
        let Some(ref base) = self.provider.api_base else {
            return Ok(());
        };

        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("provider.api_base must be an http or https URL, got `{base}`");
        }

        Ok(())
    }

    /// Deployment-keyed Azure hosting cannot build a URL without a deployment
    fn validate_deployment(&self) -> anyhow::Result<()> {
        let provider = &self.provider;

        if provider.api_type.uses_deployment_path() && provider.deployment.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!("provider.deployment is required when api_type is `azure` or `azure-openai`");
        }

        Ok(())
    }
}
