use thiserror::Error;

/// Errors that can occur while talking to an OpenAI-compatible backend
///
/// A user-initiated abort is not an error: single-shot calls return
/// `Ok(None)` and streams simply end.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Adapter configuration cannot address the backend
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backend answered with a non-success status; `body` is the raw response text
    #[error("{body}")]
    Transport { status: u16, body: String },

    /// HTTP request could not be completed
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Error during streaming response
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Response is missing a structurally required field
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Whether the same call might succeed if the caller tries again
    ///
    /// Transient transport failures and 5xx/429 statuses qualify. This layer
    /// never retries on its own.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => *status == 429 || *status >= 500,
            Self::Upstream(_) | Self::Streaming(_) => true,
            Self::Configuration(_) | Self::MalformedResponse(_) => false,
        }
    }
}
