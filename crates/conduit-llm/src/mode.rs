//! Per-request choice between the chat and legacy completion protocols

use std::fmt;

use crate::endpoint::EndpointKind;
use crate::family::ModelProfile;

/// Protocol used for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// `chat/completions` with a message list
    Chat,
    /// `completions` with a raw prompt
    Legacy,
    /// `fim/completions` with prefix and suffix; only entered explicitly
    Fim,
}

impl CompletionMode {
    /// Endpoint serving this mode
    pub const fn endpoint(self) -> EndpointKind {
        match self {
            Self::Chat => EndpointKind::ChatCompletions,
            Self::Legacy => EndpointKind::Completions,
            Self::Fim => EndpointKind::FimCompletions,
        }
    }
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chat => "chat",
            Self::Legacy => "legacy",
            Self::Fim => "fim",
        })
    }
}

/// Caller and backend preferences that can push a request to legacy mode
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteFlags {
    /// Configured preference for the `completions` endpoint
    pub use_legacy_completions_endpoint: bool,
    /// Caller asked for the prompt to be sent verbatim
    pub raw: bool,
    /// Backend serves the `completions` endpoint
    pub supports_completions: bool,
}

/// Choose between chat and legacy completion for `model`
///
/// Chat-only model generations always use chat, even when listed as
/// completion-only or when a legacy flag is set.
pub fn select_mode(model: &str, flags: RouteFlags) -> CompletionMode {
    route(&ModelProfile::classify(model), flags)
}

fn route(profile: &ModelProfile, flags: RouteFlags) -> CompletionMode {
    let wants_legacy = profile.completion_only || flags.use_legacy_completions_endpoint || flags.raw;

    if !profile.chat_only && flags.supports_completions && wants_legacy {
        CompletionMode::Legacy
    } else {
        CompletionMode::Chat
    }
}
