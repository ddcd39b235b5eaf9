//! Typed error taxonomy for the ACP runtime adapter.

use thiserror::Error;

/// Errors surfaced by the ACP runtime adapter.
///
/// Variants map onto the error kinds enumerated by the adapter's error
/// handling design: backend availability, turn preconditions, RPC failure,
/// control-method timeouts, unexpected child exit, and configuration
/// validation. Cancellation is deliberately absent — it is never an error,
/// always a terminal `done` event (see [`crate::Event`]).
#[derive(Debug, Error)]
pub enum AcpError {
    /// `doctor`/`probeAvailability` determined the configured command is not
    /// runnable.
    #[error("ACP_BACKEND_UNAVAILABLE: {0}")]
    BackendUnavailable(String),

    /// `runTurn` was invoked against a session key with no live
    /// [`crate::session::AgentSession`]. Raised synchronously, never yielded
    /// as a turn event.
    #[error("ACP_TURN_FAILED: {0}")]
    TurnFailed(String),

    /// The agent replied to a request with a JSON-RPC `error` object, or the
    /// transport rejected a pending request for a non-timeout reason.
    #[error("agent rejected request: {0}")]
    Rpc(String),

    /// A control-plane method (`initialize`, `session/new`, `session/cancel`,
    /// `session/set_mode`) exceeded its 30-second timeout.
    #[error("request timed out after {secs}s: {method}")]
    Timeout { method: String, secs: u64 },

    /// The child process exited (or its stdin/stdout pipe closed) while
    /// requests were still pending against it.
    #[error("agent process exited")]
    ProcessExited,

    /// Spawning the configured command failed (missing binary, permission
    /// denied, etc).
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),

    /// A `ResolvedConfig` field had the wrong shape; `path` names the
    /// offending field using dotted-path notation.
    #[error("invalid configuration at `{path}`: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AcpError>;
