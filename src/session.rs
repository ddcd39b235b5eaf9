//! Agent Session: owns one child process, its JSON-RPC transport (id
//! allocation, pending-request correlation, control-method timeouts), the
//! Line Framer that reads its stdout, and the single-slot notification sink
//! a running turn attaches to.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::{Mutex, mpsc, oneshot, watch};

use crate::config::ResolvedConfig;
use crate::error::AcpError;
use crate::launcher;
use crate::notification::{self, Event};
use crate::protocol::rpc::{IncomingMessage, OutgoingErrorResponse, OutgoingRequest};
use crate::protocol::session::SessionUpdate;

/// Control-plane methods subject to [`CONTROL_TIMEOUT`]. `session/prompt` is
/// deliberately absent — it is the untimed streaming request.
const CONTROL_METHODS: &[&str] = &["initialize", "session/new", "session/cancel", "session/set_mode"];
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

type PendingSlot = oneshot::Sender<Result<Value, AcpError>>;

/// One live agent child process plus its transport state.
///
/// Mutated only by its own background reader/reaper tasks and by the
/// [`crate::registry::SessionRegistry`] that owns it — see the aggregate
/// invariants in the data model.
pub struct AgentSession {
    stdin: Mutex<ChildStdin>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingSlot>>,
    sink: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    session_id: Mutex<Option<String>>,
    cwd: PathBuf,
    pid: Option<u32>,
    closed_tx: watch::Sender<bool>,
}

impl AgentSession {
    /// Spawn a fresh child and begin its background reader/stderr/reaper
    /// tasks. Does not perform the ACP handshake — see
    /// [`crate::registry::SessionRegistry::ensure_session`].
    pub fn spawn(config: &ResolvedConfig, cwd: PathBuf) -> Result<Arc<Self>, AcpError> {
        let spawn_config = ResolvedConfig {
            cwd: cwd.clone(),
            ..config.clone()
        };
        let mut child = launcher::spawn(&spawn_config, &[])?;
        let pid = child.id();
        let stdin = child.stdin.take().ok_or_else(|| {
            AcpError::Spawn("child process did not expose a stdin pipe".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AcpError::Spawn("child process did not expose a stdout pipe".to_string())
        })?;
        let stderr = child.stderr.take();

        let (closed_tx, _) = watch::channel(false);

        let session = Arc::new(Self {
            stdin: Mutex::new(stdin),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            sink: Mutex::new(None),
            session_id: Mutex::new(None),
            cwd,
            pid,
            closed_tx,
        });

        tokio::spawn(run_reader(Arc::clone(&session), stdout));
        if let Some(stderr) = stderr {
            tokio::spawn(run_stderr(stderr));
        }
        tokio::spawn(run_reaper(Arc::clone(&session), child));

        Ok(session)
    }

    pub fn cwd(&self) -> &PathBuf {
        &self.cwd
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    pub async fn set_session_id(&self, id: String) {
        *self.session_id.lock().await = Some(id);
    }

    /// A receiver that observes `true` once this session's process has
    /// exited (pipe EOF or reaped exit status, whichever is first).
    pub fn closed_rx(&self) -> watch::Receiver<bool> {
        self.closed_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_tx.borrow()
    }

    /// Suspends until this session's process has exited. Used both by a
    /// running turn racing an unexpected exit against the prompt response,
    /// and by the registry's close watcher, which unregisters the session
    /// the moment this resolves outside of any turn.
    pub async fn wait_until_closed(&self) {
        let mut rx = self.closed_rx();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Install the single active notification sink for this session,
    /// replacing whatever turn previously held it.
    pub async fn set_sink(&self, sink: Option<mpsc::UnboundedSender<Event>>) {
        *self.sink.lock().await = sink;
    }

    /// Send a JSON-RPC request and await its correlated response.
    ///
    /// Control-plane methods (see [`CONTROL_METHODS`]) are bounded by
    /// [`CONTROL_TIMEOUT`]; `session/prompt` is not.
    pub async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value, AcpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = OutgoingRequest::new(id, method, params);
        if let Err(e) = self.write_frame(&frame).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        if CONTROL_METHODS.contains(&method) {
            match tokio::time::timeout(CONTROL_TIMEOUT, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(AcpError::ProcessExited),
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    Err(AcpError::Timeout {
                        method: method.to_string(),
                        secs: CONTROL_TIMEOUT.as_secs(),
                    })
                }
            }
        } else {
            rx.await.unwrap_or(Err(AcpError::ProcessExited))
        }
    }

    async fn write_frame<T: Serialize>(&self, frame: &T) -> Result<(), AcpError> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(&line).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn dispatch_incoming(&self, value: Value) {
        match IncomingMessage::classify(value) {
            IncomingMessage::Response { id, result, error } => {
                let slot = self.pending.lock().await.remove(&id);
                if let Some(tx) = slot {
                    let resolved = match error {
                        Some(err) => Err(AcpError::Rpc(err.to_string())),
                        None => Ok(result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(resolved);
                }
            }
            IncomingMessage::AgentRequest { id, method, .. } => {
                log::debug!("ACP: declining agent-initiated request `{method}`");
                let response = OutgoingErrorResponse::method_not_supported(id);
                if let Err(e) = self.write_frame(&response).await {
                    log::warn!("ACP: failed to reply to agent-initiated request: {e}");
                }
            }
            IncomingMessage::SessionUpdate { params } => {
                let update = params.get("update").cloned().unwrap_or(Value::Null);
                let parsed = SessionUpdate::from_value(&update);
                if let Some(event) = notification::map_update(&parsed) {
                    let sink = self.sink.lock().await;
                    if let Some(tx) = sink.as_ref() {
                        let _ = tx.send(event);
                    }
                }
            }
            IncomingMessage::Ignored => {}
        }
    }

    /// Mark the session closed, idempotently: flips the watch channel once
    /// and rejects every still-pending request with
    /// [`AcpError::ProcessExited`]. Safe to call from both the reader and
    /// reaper tasks.
    async fn mark_closed(&self) {
        if *self.closed_tx.borrow() {
            return;
        }
        let _ = self.closed_tx.send(true);
        let mut pending = self.pending.lock().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(AcpError::ProcessExited));
        }
    }

    /// Send SIGTERM (Unix) or request process termination (other
    /// platforms). Best-effort: a process that already exited is a no-op.
    pub fn terminate(&self) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                // SAFETY: `pid` was captured from `Child::id()` right after
                // spawn; signalling a pid that has since been reaped and
                // reused by the OS is the same race every `kill(1)` has and
                // is bounded by us being the process's own parent.
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.pid;
        }
    }
}

async fn run_reader(session: Arc<AgentSession>, stdout: ChildStdout) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<Value>(&line) {
                Ok(value) => session.dispatch_incoming(value).await,
                Err(_) => continue,
            },
            Ok(None) => break,
            Err(e) => {
                log::warn!("ACP: error reading agent stdout: {e}");
                break;
            }
        }
    }
    session.mark_closed().await;
}

async fn run_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            log::warn!("ACP agent stderr: {trimmed}");
        }
    }
}

async fn run_reaper(session: Arc<AgentSession>, mut child: Child) {
    match child.wait().await {
        Ok(status) => log::debug!("ACP: agent process exited with {status}"),
        Err(e) => log::warn!("ACP: error waiting for agent process: {e}"),
    }
    session.mark_closed().await;
}
