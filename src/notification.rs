//! Notification Mapper: translates `session/update` bodies into [`Event`]s
//! delivered to the host.

use serde::Serialize;

use crate::protocol::SessionUpdate;

/// A host-facing event emitted by a running turn.
///
/// Exactly one of `Done`/`Error` terminates a turn's event stream (see
/// [`crate::turn::run_turn`]); the others may repeat any number of times.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A chunk of streamed agent output.
    TextDelta { text: String, stream: String },
    /// The agent started or updated a tool call.
    ToolCall { text: String },
    /// A status line, e.g. a tool call's progress.
    Status { text: String },
    /// The turn finished normally (or was cancelled).
    Done {
        #[serde(rename = "stopReason")]
        stop_reason: String,
    },
    /// The turn finished abnormally.
    Error { message: String },
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Done { .. } | Event::Error { .. })
    }

    pub fn cancelled() -> Self {
        Event::Done {
            stop_reason: "cancelled".to_string(),
        }
    }
}

/// Map one parsed `session/update` body to an [`Event`], or `None` if the
/// update kind carries no host-visible signal.
pub fn map_update(update: &SessionUpdate) -> Option<Event> {
    match update {
        SessionUpdate::AgentMessageChunk { text } => Some(Event::TextDelta {
            text: text.clone(),
            stream: "output".to_string(),
        }),
        SessionUpdate::ToolCall { title } => Some(Event::ToolCall {
            text: title.clone(),
        }),
        SessionUpdate::ToolCallUpdate {
            tool_call_id,
            status,
        } => Some(Event::Status {
            text: format!("tool {tool_call_id}: {status}"),
        }),
        SessionUpdate::Unknown => None,
    }
}
