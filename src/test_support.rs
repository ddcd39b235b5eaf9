//! Shared scripted-agent fixtures for the end-to-end scenarios in the
//! testable properties design: spawns `sh -c <script>` in place of a real
//! agent binary, reading/writing the same line-delimited JSON-RPC frames a
//! real ACP agent would.
//!
//! Unix-only (`sh` is assumed present, matching the rest of the pack's own
//! `sh -c` test fixtures); the cross-platform spawn rule itself is covered
//! separately in `launcher`'s own tests.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::ResolvedConfig;

/// A `ResolvedConfig` whose command is a scripted `sh` agent.
///
/// The script receives one line of stdin per JSON-RPC request the adapter
/// sends and should reply on stdout in the shape the scenario calls for;
/// see [`handshake_prelude`] for the common `initialize`/`session/new` reply
/// every scripted scenario starts with.
pub fn scripted_config(script: &str) -> ResolvedConfig {
    ResolvedConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        env: HashMap::new(),
    }
}

/// Shell snippet consuming the `initialize` and `session/new` request lines
/// and replying with a fixed `mock-session-1` session id, the same literal
/// scenario fixtures in the testable properties design use throughout.
pub fn handshake_prelude() -> &'static str {
    concat!(
        "read -r _init; ",
        "printf '%s\\n' '{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}'; ",
        "read -r _new; ",
        "printf '%s\\n' '{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"sessionId\":\"mock-session-1\"}}'; "
    )
}
