//! OpenAI-compatible completion adapter for Conduit
//!
//! Translates canonical chat/completion requests into the wire shapes that
//! `OpenAI`, Azure-hosted and third-party OpenAI-protocol backends accept,
//! applies per-model quirks, and decodes JSON or server-sent-event responses
//! back into canonical messages and deltas.
//!
//! The pipeline per call is: [`mode`] → [`normalize`] → [`endpoint`] →
//! [`dispatch`] → [`decode`]. [`OpenAiAdapter`] wires the stages together
//! behind the [`LanguageModel`] trait.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod decode;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod family;
pub mod mode;
pub mod normalize;
pub mod protocol;
pub mod provider;
pub mod types;

pub use decode::{DeltaStream, TextStream};
pub use endpoint::EndpointKind;
pub use error::LlmError;
pub use family::{ModelFamily, ModelProfile};
pub use mode::CompletionMode;
pub use provider::LanguageModel;
pub use provider::openai::OpenAiAdapter;
pub use tokio_util::sync::CancellationToken;
pub use types::{CompletionOptions, Content, Message, MessageDelta, Prediction, Role, Tool};
