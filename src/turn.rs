//! Turn Engine: drives one `session/prompt` round trip to completion,
//! producing a lazy, finite, non-restartable sequence of [`Event`]s.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::AcpError;
use crate::notification::Event;
use crate::protocol::session::{SessionPromptParams, SessionPromptResult};
use crate::registry::{Handle, SessionRegistry};
use crate::session::AgentSession;

/// Run one prompt-to-completion turn against `handle`.
///
/// Returns a channel receiver the caller drains until it yields a terminal
/// event (`Event::Done` or `Event::Error`) or closes. A session that does
/// not exist in the registry is a *synchronous* precondition failure
/// ([`AcpError::TurnFailed`]) — it is never delivered as an `Error` event.
pub async fn run_turn(
    registry: &Arc<SessionRegistry>,
    handle: &Handle,
    text: String,
    cancel: CancellationToken,
) -> Result<mpsc::UnboundedReceiver<Event>, AcpError> {
    let (tx, rx) = mpsc::unbounded_channel();

    if cancel.is_cancelled() {
        let _ = tx.send(Event::cancelled());
        return Ok(rx);
    }

    let session = registry.get(&handle.session_key).await.ok_or_else(|| {
        AcpError::TurnFailed(format!(
            "no live session for key `{}`",
            handle.session_key
        ))
    })?;

    let session_id = session
        .session_id()
        .await
        .unwrap_or_else(|| handle.session_key.clone());

    tokio::spawn(drive_turn(session, session_id, text, cancel, tx));

    Ok(rx)
}

async fn drive_turn(
    session: Arc<AgentSession>,
    session_id: String,
    text: String,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Event>,
) {
    // Single-slot notification sink: the reader task delivers every mapped
    // `session/update` Event straight into this turn's channel, so the
    // channel itself doubles as the FIFO buffer the engine needs.
    session.set_sink(Some(tx.clone())).await;

    let prompt_params = SessionPromptParams::text(session_id.clone(), text);
    let prompt_value = serde_json::to_value(&prompt_params);

    let terminal = match prompt_value {
        Err(e) => Event::Error {
            message: e.to_string(),
        },
        Ok(params) => {
            tokio::select! {
                _ = cancel.cancelled() => {
                    fire_and_forget_cancel(Arc::clone(&session), session_id.clone());
                    Event::cancelled()
                }
                _ = session.wait_until_closed() => {
                    Event::Error {
                        message: "agent process exited unexpectedly".to_string(),
                    }
                }
                result = session.send_request("session/prompt", Some(params)) => {
                    terminal_from_prompt_result(result)
                }
            }
        }
    };

    let _ = tx.send(terminal);
    session.set_sink(None).await;
}

fn terminal_from_prompt_result(result: Result<serde_json::Value, AcpError>) -> Event {
    match result {
        Ok(value) => {
            let parsed: SessionPromptResult = serde_json::from_value(value).unwrap_or_default();
            Event::Done {
                stop_reason: parsed.stop_reason.unwrap_or_else(|| "end_turn".to_string()),
            }
        }
        Err(e) => Event::Error {
            message: e.to_string(),
        },
    }
}

/// Issue `session/cancel` without blocking the turn's unwind on the
/// round-trip; log-and-drop on failure.
fn fire_and_forget_cancel(session: Arc<AgentSession>, session_id: String) {
    tokio::spawn(async move {
        let params = serde_json::json!({ "sessionId": session_id });
        if let Err(e) = session.send_request("session/cancel", Some(params)).await {
            log::warn!("ACP: session/cancel failed: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn unreachable_handle() -> Handle {
        Handle {
            session_key: "missing".to_string(),
            backend_id: "test".to_string(),
            runtime_session_name: "missing".to_string(),
            cwd: PathBuf::from("."),
        }
    }

    #[tokio::test]
    async fn pre_aborted_signal_yields_only_cancelled_done() {
        let registry = Arc::new(SessionRegistry::new(ResolvedConfig {
            command: "/no/such/binary".to_string(),
            args: vec![],
            cwd: PathBuf::from("."),
            env: HashMap::new(),
        }));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut rx = run_turn(&registry, &unreachable_handle(), "hi".to_string(), cancel)
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            Event::Done {
                stop_reason: "cancelled".to_string()
            }
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unknown_session_fails_synchronously() {
        let registry = Arc::new(SessionRegistry::new(ResolvedConfig {
            command: "/no/such/binary".to_string(),
            args: vec![],
            cwd: PathBuf::from("."),
            env: HashMap::new(),
        }));
        let cancel = CancellationToken::new();

        let err = run_turn(&registry, &unreachable_handle(), "hi".to_string(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AcpError::TurnFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn happy_path_streams_text_delta_then_done() {
        use crate::registry::EnsureSessionInput;
        use crate::test_support::{handshake_prelude, scripted_config};

        let script = format!(
            "{}read -r _prompt; \
             printf '%s\\n' '{{\"jsonrpc\":\"2.0\",\"method\":\"session/update\",\"params\":{{\"sessionId\":\"mock-session-1\",\"update\":{{\"sessionUpdate\":\"agent_message_chunk\",\"content\":{{\"type\":\"text\",\"text\":\"hello\"}}}}}}}}'; \
             printf '%s\\n' '{{\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{{\"stopReason\":\"end_turn\"}}}}'",
            handshake_prelude()
        );

        let registry = Arc::new(SessionRegistry::new(scripted_config(&script)));
        let handle = registry
            .ensure_session(EnsureSessionInput {
                session_key: "s1".to_string(),
                cwd: None,
                agent: "mock".to_string(),
                mode: None,
            })
            .await
            .expect("handshake should succeed");
        assert_eq!(handle.runtime_session_name, "mock-session-1");

        let mut rx = run_turn(&registry, &handle, "hi".to_string(), CancellationToken::new())
            .await
            .unwrap();

        let first = rx.recv().await.expect("text delta event");
        assert_eq!(
            first,
            Event::TextDelta {
                text: "hello".to_string(),
                stream: "output".to_string()
            }
        );
        let second = rx.recv().await.expect("terminal event");
        assert_eq!(
            second,
            Event::Done {
                stop_reason: "end_turn".to_string()
            }
        );
        assert!(rx.recv().await.is_none());

        registry.close_all().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn malformed_lines_from_agent_do_not_fail_the_turn() {
        use crate::registry::EnsureSessionInput;
        use crate::test_support::{handshake_prelude, scripted_config};

        // Interleaves non-JSON noise around the real notification and
        // response lines; the turn must still complete on the valid frames.
        let script = format!(
            "{}read -r _prompt; \
             printf 'not json at all\\n'; \
             printf '%s\\n' '{{\"jsonrpc\":\"2.0\",\"method\":\"session/update\",\"params\":{{\"sessionId\":\"mock-session-1\",\"update\":{{\"sessionUpdate\":\"agent_message_chunk\",\"content\":{{\"type\":\"text\",\"text\":\"hello\"}}}}}}}}'; \
             printf 'also not json {{{{\\n'; \
             printf '%s\\n' '{{\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{{\"stopReason\":\"end_turn\"}}}}'",
            handshake_prelude()
        );

        let registry = Arc::new(SessionRegistry::new(scripted_config(&script)));
        let handle = registry
            .ensure_session(EnsureSessionInput {
                session_key: "s1".to_string(),
                cwd: None,
                agent: "mock".to_string(),
                mode: None,
            })
            .await
            .expect("handshake should succeed");

        let mut rx = run_turn(&registry, &handle, "hi".to_string(), CancellationToken::new())
            .await
            .unwrap();

        let first = rx.recv().await.expect("text delta event");
        assert_eq!(
            first,
            Event::TextDelta {
                text: "hello".to_string(),
                stream: "output".to_string()
            }
        );
        let second = rx.recv().await.expect("terminal event");
        assert_eq!(
            second,
            Event::Done {
                stop_reason: "end_turn".to_string()
            }
        );
        assert!(rx.recv().await.is_none());

        registry.close_all().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn mid_turn_cancellation_against_hung_agent_yields_cancelled_done() {
        use crate::registry::EnsureSessionInput;
        use crate::test_support::{handshake_prelude, scripted_config};

        // Accepts the prompt request line and then never replies.
        let script = format!("{}read -r _prompt; sleep 5", handshake_prelude());

        let registry = Arc::new(SessionRegistry::new(scripted_config(&script)));
        let handle = registry
            .ensure_session(EnsureSessionInput {
                session_key: "s1".to_string(),
                cwd: None,
                agent: "mock".to_string(),
                mode: None,
            })
            .await
            .expect("handshake should succeed");

        let cancel = CancellationToken::new();
        let mut rx = run_turn(&registry, &handle, "hi".to_string(), cancel.clone())
            .await
            .unwrap();

        let cancel_handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            cancel.cancel();
        });

        let terminal = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("turn should unwind even though the agent never replies")
            .expect("a terminal event");
        assert_eq!(
            terminal,
            Event::Done {
                stop_reason: "cancelled".to_string()
            }
        );
        assert!(rx.recv().await.is_none());

        cancel_handle.await.unwrap();
        registry.close_all().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unexpected_exit_during_prompt_yields_error_event() {
        use crate::registry::EnsureSessionInput;
        use crate::test_support::{handshake_prelude, scripted_config};

        // Reads the prompt request line, then exits without ever replying.
        let script = format!("{}read -r _prompt; exit 1", handshake_prelude());

        let registry = Arc::new(SessionRegistry::new(scripted_config(&script)));
        let handle = registry
            .ensure_session(EnsureSessionInput {
                session_key: "s1".to_string(),
                cwd: None,
                agent: "mock".to_string(),
                mode: None,
            })
            .await
            .expect("handshake should succeed");

        let mut rx = run_turn(&registry, &handle, "hi".to_string(), CancellationToken::new())
            .await
            .unwrap();

        let terminal = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("turn should notice the closed pipe")
            .expect("a terminal event");
        assert!(matches!(terminal, Event::Error { .. }));
        assert!(rx.recv().await.is_none());

        registry.close_all().await;
    }
}
