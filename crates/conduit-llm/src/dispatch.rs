//! Single HTTP exchange with the backend

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::LlmError;

/// Duplicate auth header read by Azure gateways
const AZURE_API_KEY_HEADER: &str = "api-key";

/// Auth header read by fill-in-middle backends
const FIM_API_KEY_HEADER: &str = "x-api-key";

/// Header set attached to an outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Bearer token plus the duplicate `api-key` header
    Standard,
    /// Bearer token, `x-api-key` and `Accept: application/json`
    Fim,
}

/// Issues one request per call against a pooled [`Client`]
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    api_key: Option<SecretString>,
}

impl Dispatcher {
    pub const fn new(client: Client, api_key: Option<SecretString>) -> Self {
        Self { client, api_key }
    }

    /// POST `body` as JSON, aborting if `cancel` fires first
    ///
    /// Returns `Ok(None)` when the request was cancelled. Status codes are not
    /// inspected here.
    pub async fn post_json<B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
        headers: HeaderProfile,
        cancel: &CancellationToken,
    ) -> Result<Option<Response>, LlmError> {
        let builder = self.client.post(url).json(body).headers(self.headers(headers)?);
        cancellable(send(builder), cancel).await
    }

    /// POST `body` as JSON without a cancellation signal
    pub async fn post_json_uncancellable<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<Response, LlmError> {
        let builder = self
            .client
            .post(url)
            .json(body)
            .headers(self.headers(HeaderProfile::Standard)?);
        send(builder).await
    }

    /// GET `url` with the standard auth headers
    pub async fn get(&self, url: Url) -> Result<Response, LlmError> {
        let builder = self.client.get(url).headers(self.headers(HeaderProfile::Standard)?);
        send(builder).await
    }

    fn headers(&self, profile: HeaderProfile) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();

        if profile == HeaderProfile::Fim {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }

        let Some(key) = &self.api_key else {
            return Ok(headers);
        };

        let name = match profile {
            HeaderProfile::Standard => AZURE_API_KEY_HEADER,
            HeaderProfile::Fim => FIM_API_KEY_HEADER,
        };
        headers.insert(reqwest::header::AUTHORIZATION, secret_header(&format!("Bearer {}", key.expose_secret()))?);
        headers.insert(name, secret_header(key.expose_secret())?);

        Ok(headers)
    }
}

/// Header value that is redacted from `Debug` output
fn secret_header(value: &str) -> Result<HeaderValue, LlmError> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        LlmError::Configuration("api key contains characters that are not allowed in HTTP headers".to_owned())
    })?;
    header.set_sensitive(true);
    Ok(header)
}

async fn send(builder: RequestBuilder) -> Result<Response, LlmError> {
    builder.send().await.map_err(|e| {
        tracing::error!(error = %e, "upstream request failed");
        LlmError::Upstream(e.to_string())
    })
}

/// Race `operation` against `cancel`, yielding `None` if cancellation wins
///
/// Dropping the losing request future aborts the connection.
pub(crate) async fn cancellable<T, F>(operation: F, cancel: &CancellationToken) -> Result<Option<T>, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!("request cancelled by caller");
            Ok(None)
        }
        result = operation => result.map(Some),
    }
}
