//! `Adapter`: the single programmatic surface the host drives. Ties the
//! Session Registry, Turn Engine, and Availability Probe together behind
//! the operations listed in the external interfaces.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ResolvedConfig;
use crate::error::AcpError;
use crate::notification::Event;
use crate::probe::{DoctorReport, HealthProbe, doctor};
use crate::protocol::session::SessionSetModeParams;
use crate::registry::{EnsureSessionInput, Handle, SessionRegistry};
use crate::turn;

/// Capabilities the adapter reports back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub controls: Vec<String>,
}

/// Status summary for [`Adapter::get_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub summary: String,
}

/// Runtime adapter for one resolved backend configuration.
///
/// One `Adapter` drives one external agent command; hosting multiple
/// distinct agent binaries means constructing multiple `Adapter`s (the
/// core deliberately does not multiplex sessions onto a shared process).
pub struct Adapter {
    registry: Arc<SessionRegistry>,
    probe: HealthProbe,
}

impl Adapter {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(config)),
            probe: HealthProbe::new(),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        self.registry.config()
    }

    /// `ensureSession({sessionKey, agent, mode, cwd?}) -> Handle`.
    pub async fn ensure_session(&self, input: EnsureSessionInput) -> Result<Handle, AcpError> {
        self.registry.ensure_session(input).await
    }

    /// `runTurn({handle, text, mode, requestId, signal?}) -> lazy sequence of Event`.
    ///
    /// `mode` and `requestId` are accepted for interface parity with the
    /// host's call shape but are not consulted by the turn algorithm itself
    /// (mode changes go through [`Adapter::set_mode`]; `requestId` is the
    /// host's own correlation token, opaque to the adapter).
    pub async fn run_turn(
        &self,
        handle: &Handle,
        text: String,
        cancel: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<Event>, AcpError> {
        turn::run_turn(&self.registry, handle, text, cancel).await
    }

    /// `cancel({handle, reason?}) -> void`. A no-op if the session is
    /// unknown; failures are logged, not propagated (fire-and-forget, same
    /// as the abort-driven cancel issued from inside a running turn).
    pub async fn cancel(&self, handle: &Handle) {
        let Some(session) = self.registry.get(&handle.session_key).await else {
            return;
        };
        let session_id = session
            .session_id()
            .await
            .unwrap_or_else(|| handle.session_key.clone());
        let params = serde_json::json!({ "sessionId": session_id });
        if let Err(e) = session.send_request("session/cancel", Some(params)).await {
            log::warn!("ACP: cancel failed: {e}");
        }
    }

    /// `close({handle, reason}) -> void`. A no-op on an unknown session.
    pub async fn close(&self, handle: &Handle) {
        self.registry.close(&handle.session_key).await;
    }

    /// `closeAll() -> void`.
    pub async fn close_all(&self) {
        self.registry.close_all().await;
    }

    /// `setMode({handle, mode}) -> void`.
    pub async fn set_mode(&self, handle: &Handle, mode: &str) -> Result<(), AcpError> {
        let session = self.registry.get(&handle.session_key).await.ok_or_else(|| {
            AcpError::TurnFailed(format!(
                "no live session for key `{}`",
                handle.session_key
            ))
        })?;
        let session_id = session
            .session_id()
            .await
            .unwrap_or_else(|| handle.session_key.clone());
        let params = SessionSetModeParams {
            session_id,
            mode_id: mode.to_string(),
        };
        session
            .send_request("session/set_mode", Some(serde_json::to_value(&params)?))
            .await?;
        Ok(())
    }

    /// `getStatus({handle}) -> {summary}`.
    pub async fn get_status(&self, handle: &Handle) -> Status {
        match self.registry.get(&handle.session_key).await {
            Some(session) => {
                let id = session
                    .session_id()
                    .await
                    .unwrap_or_else(|| handle.session_key.clone());
                Status {
                    summary: format!("running, sessionId={id}"),
                }
            }
            None => Status {
                summary: "no process".to_string(),
            },
        }
    }

    /// `getCapabilities() -> {controls: ["session/set_mode"]}`.
    pub fn get_capabilities(&self) -> Capabilities {
        Capabilities {
            controls: vec!["session/set_mode".to_string()],
        }
    }

    /// `doctor() -> {ok, code?, message}`.
    pub async fn doctor(&self) -> DoctorReport {
        doctor(self.registry.config()).await
    }

    /// `probeAvailability() -> void`.
    pub async fn probe_availability(&self) {
        self.probe.probe(self.registry.config()).await;
    }

    /// `isHealthy() -> bool`.
    pub fn is_healthy(&self) -> bool {
        self.probe.is_healthy()
    }
}
