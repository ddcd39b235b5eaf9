//! Session lifecycle and `session/update` types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::ContentBlock;

/// Parameters for the `session/new` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNewParams {
    pub cwd: String,
    pub mcp_servers: Vec<Value>,
}

impl SessionNewParams {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            mcp_servers: Vec::new(),
        }
    }
}

/// Result returned by a successful `session/new`.
///
/// `session_id` is optional on the wire: a non-compliant agent may omit it,
/// in which case the registry substitutes the session key (see
/// [`crate::registry::SessionRegistry`]).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Parameters for the `session/prompt` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPromptParams {
    pub session_id: String,
    pub prompt: Vec<ContentBlock>,
}

impl SessionPromptParams {
    pub fn text(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            prompt: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// Result returned after a prompt completes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionPromptResult {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Parameters for the `session/cancel` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCancelParams {
    pub session_id: String,
}

/// Parameters for the `session/set_mode` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetModeParams {
    pub session_id: String,
    pub mode_id: String,
}

/// A parsed `session/update` notification body. Not serde-derived: the
/// `sessionUpdate` discriminator requires manual dispatch, and unrecognized
/// variants must be preserved as `Unknown` rather than fail to parse.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A chunk of the agent's response text.
    AgentMessageChunk { text: String },
    /// A new or updated tool call.
    ToolCall { title: String },
    /// An incremental update to an in-progress tool call.
    ToolCallUpdate {
        tool_call_id: String,
        status: String,
    },
    /// Any `sessionUpdate` value the adapter does not map to an event.
    Unknown,
}

impl SessionUpdate {
    /// Parse `params.update` from a `session/update` notification.
    pub fn from_value(update: &Value) -> Self {
        match update.get("sessionUpdate").and_then(Value::as_str) {
            Some("agent_message_chunk") => {
                let text = update
                    .get("content")
                    .and_then(|c| c.get("text"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                Self::AgentMessageChunk { text }
            }
            Some("tool_call") => {
                let title = update
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or("tool")
                    .to_string();
                Self::ToolCall { title }
            }
            Some("tool_call_update") => {
                let tool_call_id = update
                    .get("toolCallId")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let status = update
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                Self::ToolCallUpdate {
                    tool_call_id,
                    status,
                }
            }
            _ => Self::Unknown,
        }
    }
}
