use serde::{Deserialize, Serialize};

use super::message::Role;

/// Incremental piece of an assistant message
///
/// Concatenating `content` across deltas, in order, reconstructs the full
/// message text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelta {
    /// Role, when the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Text fragment, possibly empty for tool-call-only deltas
    pub content: String,
    /// Tool call fragments carried by this delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

impl MessageDelta {
    /// Assistant text fragment
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Assistant),
            content: content.into(),
            tool_calls: None,
        }
    }
}

/// Partial tool call; `id` and `name` arrive on the first fragment only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call within the message's tool calls
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fragment of the JSON-encoded arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}
