//! Model-family classification
//!
//! Every vendor/model quirk the normalizer and mode router apply is keyed off
//! a [`ModelProfile`], computed once per call from the model identifier.

/// Legacy models that only serve the free-text `completions` endpoint
pub const NON_CHAT_MODELS: &[&str] = &[
    "text-davinci-002",
    "text-davinci-003",
    "code-davinci-002",
    "text-ada-001",
    "text-babbage-001",
    "text-curie-001",
    "davinci",
    "curie",
    "babbage",
    "ada",
];

/// Substrings identifying models that accept a predicted-output hint
const PREDICTION_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "mistral-large", "Fast-Apply"];

/// Model-name prefix of Fireworks-hosted models
const FIREWORKS_PREFIX: &str = "accounts/fireworks/models";

/// Reasoning model that rejects streamed responses
const NON_STREAMING_REASONING_MODEL: &str = "o1";

/// Reasoning family allowed to keep parallel tool calls
const PARALLEL_TOOL_CALL_PREFIX: &str = "o3";

/// Parameter-shaping family of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Regular chat model
    Standard,
    /// `o<digits>` reasoning series: `max_completion_tokens`, no system role
    Reasoning,
    /// Served by Fireworks, which requires `parallel_tool_calls = true`
    FireworksHosted,
}

/// Everything the request pipeline needs to know about a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelProfile {
    pub family: ModelFamily,
    /// Model belongs to a generation that only speaks the chat protocol
    pub chat_only: bool,
    /// Model name is on the legacy completion-only list
    pub completion_only: bool,
    /// Streaming must be disabled regardless of caller preference
    pub forces_non_streaming: bool,
    /// Model accepts a predicted-output hint
    pub supports_prediction: bool,
    /// Model produces well-formed output with parallel tool calls enabled
    pub supports_parallel_tool_calls: bool,
}

impl ModelProfile {
    /// Classify a model identifier
    pub fn classify(model: &str) -> Self {
        let family = if model.starts_with(FIREWORKS_PREFIX) {
            ModelFamily::FireworksHosted
        } else if is_reasoning_series(model) {
            ModelFamily::Reasoning
        } else {
            ModelFamily::Standard
        };

        Self {
            family,
            chat_only: model.starts_with("gpt") || model.starts_with('o'),
            completion_only: NON_CHAT_MODELS.contains(&model),
            forces_non_streaming: model == NON_STREAMING_REASONING_MODEL,
            supports_prediction: PREDICTION_MODELS.iter().any(|m| model.contains(m)),
            supports_parallel_tool_calls: model.starts_with(PARALLEL_TOOL_CALL_PREFIX),
        }
    }
}

/// `o` followed by at least one digit (`o1`, `o3-mini`, `o4-mini-high`)
fn is_reasoning_series(model: &str) -> bool {
    model
        .strip_prefix('o')
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}
