//! Canonical, provider-agnostic request and output types
//!
//! Callers build requests from these and receive decoded output as these;
//! the wire formats in [`crate::protocol`] never leak past the adapter.

pub mod message;
pub mod options;
pub mod stream;
pub mod tool;

pub use message::{Content, ContentPart, FunctionCall, Message, Role, ToolCall};
pub use options::{CompletionOptions, Prediction};
pub use stream::{MessageDelta, ToolCallDelta};
pub use tool::{FunctionDefinition, Tool};
