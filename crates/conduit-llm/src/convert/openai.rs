//! Conversion between canonical types and `OpenAI` wire format

use crate::protocol::openai::{
    LegacyStreamChunk, OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl,
    OpenAiMessage, OpenAiPrediction, OpenAiTool, OpenAiToolCall, ReplyMessage, StreamChunk,
};
use crate::types::{
    Content, ContentPart, FunctionCall, Message, MessageDelta, Prediction, Role, Tool, ToolCall, ToolCallDelta,
};

/// Finish reason some self-hosted servers use to mark end-of-sequence
const END_OF_SEQUENCE: &str = "eos";

// -- Outbound: canonical request pieces -> OpenAI wire format --

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        let content = match &msg.content {
            Content::Text(text) => OpenAiContent::Text(text.clone()),
            Content::Parts(parts) => OpenAiContent::Parts(parts.iter().map(Into::into).collect()),
        };

        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| OpenAiToolCall {
                    id: tc.id.clone(),
                    tool_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    },
                })
                .collect()
        });

        Self {
            role: msg.role.as_str().to_owned(),
            content: Some(content),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<&ContentPart> for OpenAiContentPart {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self::Text { text: text.clone() },
            ContentPart::Image { url, detail } => Self::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: url.clone(),
                    detail: detail.clone(),
                },
            },
        }
    }
}

/// Field-by-field copy; nothing outside this list is forwarded
impl From<&Tool> for OpenAiTool {
    fn from(tool: &Tool) -> Self {
        Self {
            tool_type: tool.tool_type.clone(),
            function: OpenAiFunction {
                name: tool.function.name.clone(),
                description: tool.function.description.clone(),
                parameters: tool.function.parameters.clone(),
                strict: tool.function.strict,
            },
        }
    }
}

impl From<&Prediction> for OpenAiPrediction {
    fn from(prediction: &Prediction) -> Self {
        match prediction {
            Prediction::Content { content } => Self {
                prediction_type: "content".to_owned(),
                content: content.clone(),
            },
        }
    }
}

// -- Inbound: OpenAI wire format -> canonical output --

impl From<ReplyMessage> for Message {
    fn from(msg: ReplyMessage) -> Self {
        let tool_calls = msg.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    function: FunctionCall {
                        name: tc.function.name,
                        arguments: tc.function.arguments,
                    },
                })
                .collect()
        });

        Self {
            role: msg.role.as_deref().map_or(Role::Assistant, parse_role),
            content: Content::Text(msg.content.unwrap_or_default()),
            tool_calls,
            tool_call_id: None,
        }
    }
}

impl From<Message> for MessageDelta {
    fn from(msg: Message) -> Self {
        let tool_calls = msg.tool_calls.map(|calls| {
            calls
                .into_iter()
                .zip(0u32..)
                .map(|(tc, index)| ToolCallDelta {
                    index,
                    id: Some(tc.id),
                    name: Some(tc.function.name),
                    arguments: Some(tc.function.arguments),
                })
                .collect()
        });

        Self {
            role: Some(msg.role),
            content: msg.content.as_text(),
            tool_calls,
        }
    }
}

/// Decode a chat stream chunk into a delta
///
/// Returns `None` for chunks with neither text nor tool-call fragments in
/// their first choice (role-only openers, finish markers, usage trailers).
pub fn chat_chunk_to_delta(chunk: &StreamChunk) -> Option<MessageDelta> {
    let delta = &chunk.choices.first()?.delta;
    let role = Some(delta.role.as_deref().map_or(Role::Assistant, parse_role));

    if let Some(content) = delta.content.as_ref().filter(|c| !c.is_empty()) {
        return Some(MessageDelta {
            role,
            content: content.clone(),
            tool_calls: None,
        });
    }

    let calls = delta.tool_calls.as_ref()?;
    let tool_calls = calls
        .iter()
        .map(|tc| ToolCallDelta {
            index: tc.index,
            id: tc.id.clone(),
            name: tc.function.as_ref().and_then(|f| f.name.clone()),
            arguments: tc.function.as_ref().and_then(|f| f.arguments.clone()),
        })
        .collect();

    Some(MessageDelta {
        role,
        content: String::new(),
        tool_calls: Some(tool_calls),
    })
}

/// Decode a legacy completion chunk into its text fragment
///
/// Empty fragments and end-of-sequence markers yield `None`.
pub fn legacy_chunk_to_text(chunk: &LegacyStreamChunk) -> Option<String> {
    let choice = chunk.choices.first()?;

    let at_end = [chunk.finish_reason.as_deref(), choice.finish_reason.as_deref()]
        .contains(&Some(END_OF_SEQUENCE));
    if at_end {
        return None;
    }

    choice.text.clone().filter(|text| !text.is_empty())
}

/// Decode a fill-in-middle chunk into its text fragment
pub fn fim_chunk_to_text(chunk: &StreamChunk) -> Option<String> {
    chunk.choices.first()?.delta.content.clone()
}

/// Parse a wire role, treating unknown roles as assistant output
fn parse_role(role: &str) -> Role {
    match role {
        "system" | "developer" => Role::System,
        "user" => Role::User,
        "tool" => Role::Tool,
        _ => Role::Assistant,
    }
}
