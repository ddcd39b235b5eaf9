//! Session Registry: maps a host-chosen session key to at most one live
//! [`AgentSession`], deduplicating concurrent initialization and
//! invalidating cached sessions on cwd change.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::config::ResolvedConfig;
use crate::error::AcpError;
use crate::protocol::initialize::InitializeParams;
use crate::protocol::session::{SessionNewParams, SessionResult};
use crate::session::AgentSession;

/// Inputs to [`SessionRegistry::ensure_session`].
#[derive(Debug, Clone)]
pub struct EnsureSessionInput {
    pub session_key: String,
    pub cwd: Option<PathBuf>,
    /// Opaque backend label carried through to the returned [`Handle`]; not
    /// interpreted by the registry (binary selection is a host concern).
    pub agent: String,
    /// Opaque interaction mode label; the registry does not itself send
    /// `session/set_mode` during initialization — see
    /// [`crate::adapter::Adapter::set_mode`].
    pub mode: Option<String>,
}

/// Opaque host-facing reference to one live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub session_key: String,
    pub backend_id: String,
    /// The agent-assigned session id, or `session_key` if the agent omitted
    /// one from `session/new` (see the open question on this fallback in
    /// the design notes).
    pub runtime_session_name: String,
    pub cwd: PathBuf,
}

/// Keyed cache of live [`AgentSession`]s for one resolved backend
/// configuration.
///
/// `sessions` is reference-counted independently of `SessionRegistry` itself
/// so the per-session close watcher (see [`spawn_close_watcher`]) can keep a
/// handle to the map and unregister its session the moment the process
/// exits, without requiring callers to hold the registry behind an `Arc`.
pub struct SessionRegistry {
    config: ResolvedConfig,
    sessions: Arc<Mutex<HashMap<String, Arc<AgentSession>>>>,
    in_flight: Mutex<HashMap<String, Arc<Notify>>>,
}

impl SessionRegistry {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Return, create, or re-create the [`AgentSession`] for `input.session_key`
    /// and hand back a [`Handle`] to it.
    pub async fn ensure_session(&self, input: EnsureSessionInput) -> Result<Handle, AcpError> {
        loop {
            if let Some(notify) = self
                .in_flight
                .lock()
                .await
                .get(&input.session_key)
                .cloned()
            {
                notify.notified().await;
                continue;
            }

            let effective_cwd = input
                .cwd
                .clone()
                .unwrap_or_else(|| self.config.cwd.clone());

            {
                let mut sessions = self.sessions.lock().await;
                if let Some(session) = sessions.get(&input.session_key).cloned() {
                    if session.is_closed() {
                        sessions.remove(&input.session_key);
                    } else if session.cwd() != &effective_cwd {
                        session.terminate();
                        sessions.remove(&input.session_key);
                    } else {
                        return Ok(build_handle(&input, &session).await);
                    }
                }
            }

            let notify = Arc::new(Notify::new());
            let claimed = {
                let mut in_flight = self.in_flight.lock().await;
                if in_flight.contains_key(&input.session_key) {
                    false
                } else {
                    in_flight.insert(input.session_key.clone(), Arc::clone(&notify));
                    true
                }
            };
            if !claimed {
                continue;
            }

            let outcome = self.init_session(&input, effective_cwd).await;

            if let Ok(session) = &outcome {
                self.sessions
                    .lock()
                    .await
                    .insert(input.session_key.clone(), Arc::clone(session));
                spawn_close_watcher(
                    Arc::clone(&self.sessions),
                    input.session_key.clone(),
                    Arc::clone(session),
                );
            }
            self.in_flight.lock().await.remove(&input.session_key);
            notify.notify_waiters();

            return match outcome {
                Ok(session) => Ok(build_handle(&input, &session).await),
                Err(e) => Err(e),
            };
        }
    }

    async fn init_session(
        &self,
        input: &EnsureSessionInput,
        effective_cwd: PathBuf,
    ) -> Result<Arc<AgentSession>, AcpError> {
        let session = AgentSession::spawn(&self.config, effective_cwd.clone())?;

        let init_params = InitializeParams::default();
        if let Err(e) = session
            .send_request("initialize", Some(serde_json::to_value(&init_params)?))
            .await
        {
            session.terminate();
            return Err(e);
        }

        let session_new = SessionNewParams::new(effective_cwd.to_string_lossy().to_string());
        let result = match session
            .send_request("session/new", Some(serde_json::to_value(&session_new)?))
            .await
        {
            Ok(v) => v,
            Err(e) => {
                session.terminate();
                return Err(e);
            }
        };

        let parsed: SessionResult = match serde_json::from_value(result) {
            Ok(p) => p,
            Err(e) => {
                session.terminate();
                return Err(AcpError::Json(e));
            }
        };

        let session_id = parsed
            .session_id
            .unwrap_or_else(|| input.session_key.clone());
        session.set_session_id(session_id).await;

        Ok(session)
    }

    /// Look up the live session behind a key, e.g. for `runTurn`, `cancel`,
    /// `setMode`, `getStatus`.
    pub async fn get(&self, session_key: &str) -> Option<Arc<AgentSession>> {
        self.sessions.lock().await.get(session_key).cloned()
    }

    /// Terminate and forget the session behind `session_key`, if any. A
    /// no-op for an unknown key.
    pub async fn close(&self, session_key: &str) {
        if let Some(session) = self.sessions.lock().await.remove(session_key) {
            session.terminate();
        }
    }

    /// Terminate every live session and empty the registry.
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.sessions.lock().await.drain().map(|(_, v)| v).collect();
        for session in drained {
            session.terminate();
        }
    }
}

/// Unregister `key` from `sessions` the moment `session`'s process exits,
/// unless the entry has since been replaced by a different session (cwd
/// invalidation, or a fresh `ensure_session` after this one was already
/// removed) — in which case this is a no-op, per the aggregate invariant
/// that mutations to the map come only from `ensure_session`, `close`,
/// `close_all`, and this process-close hook.
fn spawn_close_watcher(
    sessions: Arc<Mutex<HashMap<String, Arc<AgentSession>>>>,
    key: String,
    session: Arc<AgentSession>,
) {
    tokio::spawn(async move {
        session.wait_until_closed().await;
        let mut sessions = sessions.lock().await;
        if sessions
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &session))
        {
            sessions.remove(&key);
        }
    });
}

async fn build_handle(input: &EnsureSessionInput, session: &Arc<AgentSession>) -> Handle {
    Handle {
        session_key: input.session_key.clone(),
        backend_id: input.agent.clone(),
        runtime_session_name: session
            .session_id()
            .await
            .unwrap_or_else(|| input.session_key.clone()),
        cwd: session.cwd().clone(),
    }
}
