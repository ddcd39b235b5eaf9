//! The raw JSON-RPC 2.0 envelope: outbound requests and the three shapes an
//! inbound line can take (response, agent-initiated request, notification).

use serde::Serialize;
use serde_json::Value;

/// JSON-RPC error code returned for agent-initiated requests the adapter
/// declines to service.
pub const METHOD_NOT_SUPPORTED: i64 = -32601;

/// An outbound JSON-RPC 2.0 request frame, serialized to one line of stdin.
#[derive(Debug, Serialize)]
pub struct OutgoingRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> OutgoingRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// The error object the adapter sends back for agent-initiated requests.
#[derive(Debug, Clone, Serialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl RpcErrorObject {
    pub fn method_not_supported() -> Self {
        Self {
            code: METHOD_NOT_SUPPORTED,
            message: "Method not supported by this client".to_string(),
        }
    }
}

/// An outbound decline sent in reply to an agent-initiated request.
#[derive(Debug, Serialize)]
pub struct OutgoingErrorResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    pub error: RpcErrorObject,
}

impl OutgoingErrorResponse {
    pub fn method_not_supported(id: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: RpcErrorObject::method_not_supported(),
        }
    }
}

/// The classification of one parsed line of agent stdout, per the dispatch
/// rule: an `id` with a `method` is an agent-initiated request; an `id`
/// alone is a response; `method == "session/update"` is the one
/// notification the adapter interprets; everything else is ignored.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A response to a request the adapter sent, keyed by `id`.
    Response {
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    },
    /// A request initiated by the agent, awaiting a reply.
    AgentRequest {
        id: Value,
        method: String,
        #[allow(dead_code)]
        params: Option<Value>,
    },
    /// A `session/update` notification.
    SessionUpdate { params: Value },
    /// Any other shape: malformed, unknown method, or not of interest.
    Ignored,
}

impl IncomingMessage {
    /// Classify one parsed JSON line according to the dispatch rule in the
    /// RPC Transport component.
    pub fn classify(value: Value) -> Self {
        let has_id = value.get("id").is_some_and(|v| !v.is_null());
        let method = value.get("method").and_then(Value::as_str);

        match (has_id, method) {
            (true, Some(method)) => Self::AgentRequest {
                id: value.get("id").cloned().unwrap_or(Value::Null),
                method: method.to_string(),
                params: value.get("params").cloned(),
            },
            (true, None) => {
                let id = match value.get("id").and_then(Value::as_u64) {
                    Some(id) => id,
                    None => return Self::Ignored,
                };
                Self::Response {
                    id,
                    result: value.get("result").cloned(),
                    error: value.get("error").cloned(),
                }
            }
            (false, Some("session/update")) => match value.get("params").cloned() {
                Some(params) => Self::SessionUpdate { params },
                None => Self::Ignored,
            },
            _ => Self::Ignored,
        }
    }
}
