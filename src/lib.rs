//! acp-runtime-adapter: a runtime adapter that drives an external Agent
//! Client Protocol (ACP) agent process over stdio.
//!
//! The crate owns process lifecycle, the JSON-RPC line-delimited transport,
//! session bookkeeping, and the turn-driving engine; it does not make any
//! UI, policy, or backend-selection decisions — those stay with the host.
//!
//! # Architecture
//!
//! - [`config`] - host-supplied backend configuration, validated into a [`config::ResolvedConfig`]
//! - [`error`] - the [`error::AcpError`] taxonomy shared across every module
//! - [`launcher`] - cross-platform child process spawning
//! - [`protocol`] - ACP wire types (initialize, session, JSON-RPC envelopes)
//! - [`session`] - one live agent process: transport, pending-request correlation, notification sink
//! - [`registry`] - keyed cache of live sessions, deduplicating concurrent initialization
//! - [`turn`] - drives one `session/prompt` round trip to a lazy sequence of events
//! - [`notification`] - maps agent `session/update` payloads to host-facing [`notification::Event`]s
//! - [`probe`] - one-shot backend availability check and `doctor` diagnostic
//! - [`adapter`] - the single programmatic surface the host drives
//!
//! # Example
//!
//! ```ignore
//! use acp_runtime_adapter::{Adapter, ResolvedConfig, EnsureSessionInput};
//! use tokio_util::sync::CancellationToken;
//!
//! let adapter = Adapter::new(ResolvedConfig::with_defaults("/workspace".into()));
//! let handle = adapter.ensure_session(EnsureSessionInput {
//!     session_key: "tab-1".to_string(),
//!     cwd: None,
//!     agent: "kiro-cli".to_string(),
//!     mode: None,
//! }).await?;
//!
//! let mut events = adapter.run_turn(&handle, "hello".to_string(), CancellationToken::new()).await?;
//! while let Some(event) = events.recv().await {
//!     // forward to the host UI
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod launcher;
pub mod notification;
pub mod probe;
pub mod protocol;
pub mod registry;
pub mod session;
#[cfg(test)]
pub(crate) mod test_support;
pub mod turn;

pub use adapter::{Adapter, Capabilities, Status};
pub use config::ResolvedConfig;
pub use error::{AcpError, Result};
pub use notification::Event;
pub use probe::{DoctorReport, HealthProbe};
pub use registry::{EnsureSessionInput, Handle, SessionRegistry};
pub use session::AgentSession;
pub use turn::run_turn;
