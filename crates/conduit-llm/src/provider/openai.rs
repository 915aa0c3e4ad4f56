//! OpenAI-compatible adapter
//!
//! Serves `api.openai.com`, Azure-hosted deployments and third-party
//! backends that speak the same protocol. Each call walks the pipeline
//! once: mode router, normalizer, endpoint resolver, dispatcher, decoder.

use std::future::ready;
use std::pin::Pin;

use async_trait::async_trait;
use conduit_config::ProviderConfig;
use futures_util::{Stream, StreamExt, TryStreamExt, stream};
use reqwest::{Client, Response};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::LanguageModel;
use crate::decode::{
    DeltaStream, TextStream, chat_deltas, decode_message, ensure_success, fim_text, legacy_text, require_success,
};
use crate::dispatch::{Dispatcher, HeaderProfile};
use crate::endpoint::{EndpointKind, resolve};
use crate::error::LlmError;
use crate::mode::{CompletionMode, RouteFlags, select_mode};
use crate::normalize::{fim_request, into_legacy, max_stop_words, normalize};
use crate::protocol::openai::{EmbeddingRequest, EmbeddingResponse, ModelList};
use crate::types::{CompletionOptions, Message, MessageDelta};

/// Adapter for one configured OpenAI-compatible backend
///
/// Configuration is read-only after construction, so one adapter can serve
/// any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    config: ProviderConfig,
    dispatcher: Dispatcher,
}

impl OpenAiAdapter {
    /// Create an adapter with a fresh HTTP client
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an adapter that shares an existing HTTP client
    pub fn with_client(config: ProviderConfig, client: Client) -> Self {
        let dispatcher = Dispatcher::new(client, config.api_key.clone());
        Self { config, dispatcher }
    }

    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    const fn route_flags(&self, options: &CompletionOptions) -> RouteFlags {
        RouteFlags {
            use_legacy_completions_endpoint: self.config.use_legacy_completions_endpoint,
            raw: options.raw,
            supports_completions: self.config.supports_completions,
        }
    }

    async fn post<B: Serialize + Sync>(
        &self,
        endpoint: EndpointKind,
        body: &B,
        headers: HeaderProfile,
        cancel: &CancellationToken,
    ) -> Result<Option<Response>, LlmError> {
        let url = resolve(endpoint, &self.config)?;
        tracing::debug!(%endpoint, %url, "dispatching request");
        self.dispatcher.post_json(url, body, headers, cancel).await
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<DeltaStream, LlmError> {
        let body = normalize(options, messages, max_stop_words(&self.config));

        let Some(response) = self
            .post(CompletionMode::Chat.endpoint(), &body, HeaderProfile::Standard, cancel)
            .await?
        else {
            return Ok(finished());
        };

        if !body.stream {
            let message = decode_message(response, cancel).await?;
            let delta = message.map(|m| Ok::<_, LlmError>(MessageDelta::from(m)));
            let delta = stream::iter(delta).take_until(cancel.clone().cancelled_owned());
            return Ok(Box::pin(delta));
        }

        match ensure_success(response, cancel).await? {
            Some(response) => Ok(chat_deltas(response, cancel)),
            None => Ok(finished()),
        }
    }

    async fn legacy_stream(
        &self,
        prompt: String,
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<TextStream, LlmError> {
        let body = into_legacy(normalize(options, &[], max_stop_words(&self.config)), prompt);

        let Some(response) = self
            .post(CompletionMode::Legacy.endpoint(), &body, HeaderProfile::Standard, cancel)
            .await?
        else {
            return Ok(finished());
        };

        match ensure_success(response, cancel).await? {
            Some(response) => Ok(legacy_text(response, cancel)),
            None => Ok(finished()),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiAdapter {
    async fn stream_chat(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<DeltaStream, LlmError> {
        let mode = select_mode(&options.model, self.route_flags(options));
        tracing::info!(model = %options.model, %mode, "selected completion mode");

        if mode != CompletionMode::Legacy {
            return self.chat_stream(messages, cancel, options).await;
        }

        // Legacy endpoints take a single prompt; only the last turn is sent
        let prompt = messages.last().map(|m| m.content.as_text()).unwrap_or_default();
        let text = self.legacy_stream(prompt, cancel, options).await?;
        Ok(Box::pin(text.map_ok(MessageDelta::assistant)))
    }

    async fn chat(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<Option<Message>, LlmError> {
        let options = CompletionOptions {
            stream: false,
            ..options.clone()
        };
        let body = normalize(&options, messages, max_stop_words(&self.config));
        tracing::info!(model = %options.model, mode = %CompletionMode::Chat, "sending blocking chat request");

        let Some(response) = self
            .post(CompletionMode::Chat.endpoint(), &body, HeaderProfile::Standard, cancel)
            .await?
        else {
            return Ok(None);
        };
        decode_message(response, cancel).await
    }

    async fn complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<Option<String>, LlmError> {
        let deltas = self.stream_chat(&[Message::user(prompt)], cancel, options).await?;
        let text: String = deltas.map_ok(|delta| delta.content).try_collect().await?;

        if text.is_empty() && cancel.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    async fn stream_complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<TextStream, LlmError> {
        let deltas = self.stream_chat(&[Message::user(prompt)], cancel, options).await?;
        let text = deltas
            .map_ok(|delta| delta.content)
            .try_filter(|content| ready(!content.is_empty()));
        Ok(Box::pin(text))
    }

    async fn stream_fim(
        &self,
        prefix: &str,
        suffix: &str,
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<TextStream, LlmError> {
        let body = fim_request(prefix, suffix, options);
        tracing::info!(model = %options.model, mode = %CompletionMode::Fim, "sending fill-in-middle request");

        let Some(response) = self
            .post(CompletionMode::Fim.endpoint(), &body, HeaderProfile::Fim, cancel)
            .await?
        else {
            return Ok(finished());
        };

        match ensure_success(response, cancel).await? {
            Some(response) => Ok(fim_text(response, cancel)),
            None => Ok(finished()),
        }
    }

    async fn embed(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let model = self
            .config
            .model
            .clone()
            .ok_or_else(|| LlmError::Configuration("no embeddings model configured, set `provider.model`".to_owned()))?;
        let url = resolve(EndpointKind::Embeddings, &self.config)?;
        let batch_size = self.config.max_embedding_batch_size.max(1);

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            tracing::debug!(%model, batch = batch.len(), "requesting embeddings");

            let request = EmbeddingRequest {
                input: batch.to_vec(),
                model: model.clone(),
            };
            let response = self.dispatcher.post_json_uncancellable(url.clone(), &request).await?;
            let mut parsed: EmbeddingResponse = require_success(response)
                .await?
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse(format!("failed to parse embeddings: {e}")))?;

            if parsed.data.len() != batch.len() {
                return Err(LlmError::MalformedResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    parsed.data.len()
                )));
            }

            parsed.data.sort_by_key(|item| item.index);
            vectors.extend(parsed.data.into_iter().map(|item| item.embedding));
        }

        Ok(vectors)
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = resolve(EndpointKind::Models, &self.config)?;
        let response = require_success(self.dispatcher.get(url).await?).await?;

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(format!("failed to parse model list: {e}")))?;

        Ok(list.data.into_iter().map(|model| model.id).collect())
    }
}

/// Sequence that ends immediately, returned for cancelled calls
fn finished<T: Send + 'static>() -> Pin<Box<dyn Stream<Item = Result<T, LlmError>> + Send>> {
    Box::pin(stream::empty())
}
