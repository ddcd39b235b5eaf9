//! Resolved, immutable configuration for one agent backend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::AcpError;

/// Default command when the host supplies none.
pub const DEFAULT_COMMAND: &str = "kiro-cli";

fn default_args() -> Vec<String> {
    vec!["acp".to_string()]
}

/// Resolved launch configuration for one agent backend.
///
/// Established once at construction and never mutated afterwards; every
/// [`crate::session::AgentSession`] spawned from it captures its own copy of
/// the fields it needs (`cwd` may be overridden per-session, see
/// [`crate::registry::SessionRegistry::ensure_session`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
}

impl ResolvedConfig {
    /// Build a config with adapter defaults, overriding `cwd` with the
    /// current process directory if `workspace_dir` is `None`.
    pub fn with_defaults(workspace_dir: Option<PathBuf>) -> Self {
        let cwd = workspace_dir
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            command: DEFAULT_COMMAND.to_string(),
            args: default_args(),
            cwd,
            env: HashMap::new(),
        }
    }
}

/// Parse a [`ResolvedConfig`] out of a host-supplied, already-deserialized
/// JSON document of the shape `{command, args, cwd, env}`. Every field is
/// optional; a present field with the wrong JSON type is rejected with a
/// path-qualified [`AcpError::InvalidConfig`].
impl TryFrom<&Value> for ResolvedConfig {
    type Error = AcpError;

    fn try_from(raw: &Value) -> Result<Self, Self::Error> {
        let mut config = Self::with_defaults(None);

        if let Some(command) = raw.get("command") {
            config.command = command
                .as_str()
                .ok_or_else(|| invalid("command", "expected a string"))?
                .to_string();
        }

        if let Some(args) = raw.get("args") {
            let arr = args
                .as_array()
                .ok_or_else(|| invalid("args", "expected an array of strings"))?;
            config.args = arr
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(&format!("args[{i}]"), "expected a string"))
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(cwd) = raw.get("cwd") {
            let s = cwd
                .as_str()
                .ok_or_else(|| invalid("cwd", "expected a string path"))?;
            config.cwd = PathBuf::from(s);
        }

        if let Some(env) = raw.get("env") {
            let obj = env
                .as_object()
                .ok_or_else(|| invalid("env", "expected an object of string to string"))?;
            let mut map = HashMap::with_capacity(obj.len());
            for (k, v) in obj {
                let v = v
                    .as_str()
                    .ok_or_else(|| invalid(&format!("env.{k}"), "expected a string value"))?;
                map.insert(k.clone(), v.to_string());
            }
            config.env = map;
        }

        Ok(config)
    }
}

fn invalid(path: &str, message: &str) -> AcpError {
    AcpError::InvalidConfig {
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// Returns the path's extension, lowercased, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
