//! Language-model trait and the OpenAI-compatible implementation

pub mod openai;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::decode::{DeltaStream, TextStream};
use crate::error::LlmError;
use crate::types::{CompletionOptions, Message};

/// Operations a completion backend offers to the generic LLM layer
///
/// Cancellation is never an error. Single-shot calls return `Ok(None)` and
/// streams end early without yielding anything further.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Stream a chat reply as deltas, routing to chat or legacy completion
    async fn stream_chat(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<DeltaStream, LlmError>;

    /// Request a chat reply as a single message
    async fn chat(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<Option<Message>, LlmError>;

    /// Complete `prompt` as one user message and return the whole reply
    async fn complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<Option<String>, LlmError>;

    /// Complete `prompt` as one user message, streaming text fragments
    async fn stream_complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<TextStream, LlmError>;

    /// Fill the gap between `prefix` and `suffix`
    async fn stream_fim(
        &self,
        prefix: &str,
        suffix: &str,
        cancel: &CancellationToken,
        options: &CompletionOptions,
    ) -> Result<TextStream, LlmError>;

    /// Embed each chunk, returning vectors in input order
    async fn embed(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    /// Identifiers of the models the backend serves
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;
}
