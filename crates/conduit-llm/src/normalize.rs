//! Canonical request -> wire request normalization
//!
//! [`normalize`] builds a fresh [`ChatRequest`] and threads it through a fixed
//! sequence of steps. Each step takes the body by value and returns the new
//! body, so no step can observe a half-applied quirk from another call.

use conduit_config::ProviderConfig;

use crate::family::{ModelFamily, ModelProfile};
use crate::protocol::openai::{ChatRequest, FimRequest, LegacyCompletionRequest, OpenAiMessage, Sampling};
use crate::types::{CompletionOptions, Message, Prediction};

/// Stop-sequence cap for `api.deepseek.com`
const DEEPSEEK_MAX_STOP_WORDS: usize = 16;

/// Stop-sequence cap for `OpenAI`, Groq, Azure and local gateways
const STRICT_MAX_STOP_WORDS: usize = 4;

/// Port used by local OpenAI-compatible gateways that reject long stop lists
const LOCAL_GATEWAY_PORT: u16 = 1337;

/// Maximum number of stop sequences the configured backend accepts
///
/// An explicit `max_stop_words` override always wins. `None` means no cap.
pub fn max_stop_words(config: &ProviderConfig) -> Option<usize> {
    if let Some(limit) = config.max_stop_words {
        return Some(limit);
    }

    let base = config.api_base.as_ref()?;
    let host = base.host_str();

    if host == Some("api.deepseek.com") {
        return Some(DEEPSEEK_MAX_STOP_WORDS);
    }

    let strict = base.port() == Some(LOCAL_GATEWAY_PORT)
        || matches!(host, Some("api.openai.com" | "api.groq.com"))
        || config.api_type.is_azure();

    strict.then_some(STRICT_MAX_STOP_WORDS)
}

/// Build the chat-completions body for `options` and `messages`
///
/// Deterministic: identical inputs always serialize to identical bytes.
pub fn normalize(options: &CompletionOptions, messages: &[Message], stop_limit: Option<usize>) -> ChatRequest {
    let profile = ModelProfile::classify(&options.model);

    let body = base_body(options, messages);
    let body = cap_stop_words(body, stop_limit);
    let body = apply_reasoning_rules(body, &profile);
    let body = apply_streaming_rules(body, &profile);
    let body = apply_prediction_rules(body, options.prediction.as_ref(), &profile);
    apply_tool_rules(body, &profile)
}

/// Re-shape a normalized chat body into a legacy completion body
///
/// The `messages` field does not exist on the result, and the legacy path is
/// always streamed.
pub fn into_legacy(body: ChatRequest, prompt: String) -> LegacyCompletionRequest {
    LegacyCompletionRequest {
        model: body.model,
        prompt,
        sampling: body.sampling,
        stream: true,
    }
}

/// Build a fill-in-middle body; no model quirks apply to this endpoint
pub fn fim_request(prefix: &str, suffix: &str, options: &CompletionOptions) -> FimRequest {
    FimRequest {
        model: options.model.clone(),
        prompt: prefix.to_owned(),
        suffix: suffix.to_owned(),
        sampling: sampling(options),
        stream: true,
    }
}

fn base_body(options: &CompletionOptions, messages: &[Message]) -> ChatRequest {
    ChatRequest {
        model: options.model.clone(),
        messages: messages.iter().map(Into::into).collect(),
        sampling: sampling(options),
        max_completion_tokens: None,
        stream: options.stream,
        tools: options
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| tools.iter().map(Into::into).collect()),
        parallel_tool_calls: None,
        prediction: None,
        response_format: options.response_format.clone(),
    }
}

fn sampling(options: &CompletionOptions) -> Sampling {
    Sampling {
        max_tokens: options.max_tokens,
        temperature: options.temperature,
        top_p: options.top_p,
        frequency_penalty: options.frequency_penalty,
        presence_penalty: options.presence_penalty,
        stop: options.stop.clone(),
    }
}

/// Keep only the first `limit` stop sequences
fn cap_stop_words(mut body: ChatRequest, limit: Option<usize>) -> ChatRequest {
    if let (Some(stop), Some(limit)) = (body.sampling.stop.as_mut(), limit) {
        stop.truncate(limit);
    }
    body
}

/// Reasoning models take `max_completion_tokens` and reject the system role
fn apply_reasoning_rules(mut body: ChatRequest, profile: &ModelProfile) -> ChatRequest {
    if profile.family != ModelFamily::Reasoning {
        return body;
    }

    body.max_completion_tokens = body.sampling.max_tokens.take();
    body.messages = body.messages.into_iter().map(system_to_user).collect();
    body
}

fn system_to_user(mut message: OpenAiMessage) -> OpenAiMessage {
    if message.role == "system" {
        "user".clone_into(&mut message.role);
    }
    message
}

fn apply_streaming_rules(mut body: ChatRequest, profile: &ModelProfile) -> ChatRequest {
    if profile.forces_non_streaming {
        body.stream = false;
    }
    body
}

/// Attach the prediction hint, or make sure none is sent
///
/// Backends reject non-zero penalties and a completion-token cap alongside a
/// prediction.
fn apply_prediction_rules(
    mut body: ChatRequest,
    prediction: Option<&Prediction>,
    profile: &ModelProfile,
) -> ChatRequest {
    match prediction {
        Some(prediction) if profile.supports_prediction => {
            let sampling = &mut body.sampling;
            sampling.presence_penalty = sampling.presence_penalty.filter(|p| *p == 0.0);
            sampling.frequency_penalty = sampling.frequency_penalty.filter(|p| *p == 0.0);
            body.max_completion_tokens = None;
            body.prediction = Some(prediction.into());
        }
        _ => body.prediction = None,
    }
    body
}

/// Decide `parallel_tool_calls` when tools are sent
///
/// Most models emit concatenated argument objects when asked for parallel
/// calls, so they are switched off. Fireworks needs them on; o3 handles them
/// and gets no flag at all, leaving the backend default.
fn apply_tool_rules(mut body: ChatRequest, profile: &ModelProfile) -> ChatRequest {
    if body.tools.as_ref().is_none_or(Vec::is_empty) {
        return body;
    }

    body.parallel_tool_calls = match profile.family {
        ModelFamily::FireworksHosted => Some(true),
        _ if profile.supports_parallel_tool_calls => None,
        _ => Some(false),
    };
    body
}
