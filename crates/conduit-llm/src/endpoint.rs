//! Endpoint URL resolution for standard and Azure-hosted backends

use std::fmt;

use conduit_config::ProviderConfig;
use url::Url;

use crate::error::LlmError;

/// API operation addressed by a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    ChatCompletions,
    Completions,
    FimCompletions,
    Embeddings,
    Models,
}

impl EndpointKind {
    /// Path relative to the API base
    pub const fn as_path(self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat/completions",
            Self::Completions => "completions",
            Self::FimCompletions => "fim/completions",
            Self::Embeddings => "embeddings",
            Self::Models => "models",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Resolve the URL for `kind` against the configured backend
///
/// Standard backends use the endpoint path verbatim under the API base.
/// Deployment-keyed Azure backends nest it under
/// `openai/deployments/{deployment}/`, and every Azure flavour receives an
/// `api-version` query parameter. Fill-in-middle is never deployment-keyed.
///
/// # Errors
///
/// Returns [`LlmError::Configuration`] when no API base is configured, or
/// when a deployment-keyed backend has no deployment name.
pub fn resolve(kind: EndpointKind, config: &ProviderConfig) -> Result<Url, LlmError> {
    let base = config
        .api_base
        .as_ref()
        .ok_or_else(|| LlmError::Configuration("no API base URL provided, set `provider.api_base`".to_owned()))?;
    let base = as_directory(base);

    if !config.api_type.is_azure() || kind == EndpointKind::FimCompletions {
        return join(&base, kind.as_path());
    }

    let mut url = if config.api_type.uses_deployment_path() {
        let deployment = config
            .deployment
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| LlmError::Configuration("azure deployment name is not configured".to_owned()))?;
        join(&base, &format!("openai/deployments/{deployment}/{}", kind.as_path()))?
    } else {
        join(&base, kind.as_path())?
    };

    url.query_pairs_mut().append_pair("api-version", config.api_version());
    Ok(url)
}

/// Ensure the base path ends with `/` so joins append instead of replacing
/// the last segment
fn as_directory(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn join(base: &Url, path: &str) -> Result<Url, LlmError> {
    base.join(path)
        .map_err(|e| LlmError::Configuration(format!("cannot resolve `{path}` against `{base}`: {e}")))
}
