//! Process Launcher: spawns an agent child process with piped stdio.

use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::config::{ResolvedConfig, extension_of};
use crate::error::AcpError;

/// Spawn `config.command` with `extra_args` appended after `config.args`,
/// wired with piped stdin/stdout/stderr.
///
/// The child's environment is the adapter process's own environment
/// overlaid by `config.env`. On Windows, `.cmd`/`.bat` commands are run
/// through a shell interpreter (`cmd.exe /C`) since Windows does not
/// execute script-shebang files directly; every other command, and every
/// command on every other platform, is spawned directly.
pub fn spawn(config: &ResolvedConfig, extra_args: &[String]) -> Result<Child, AcpError> {
    let mut cmd = build_command(config);
    cmd.args(&config.args);
    cmd.args(extra_args);
    cmd.current_dir(&config.cwd);
    cmd.envs(&config.env);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    cmd.spawn()
        .map_err(|e| AcpError::Spawn(format!("{}: {e}", config.command)))
}

#[cfg(windows)]
fn build_command(config: &ResolvedConfig) -> Command {
    let needs_shell = matches!(
        extension_of(std::path::Path::new(&config.command)).as_deref(),
        Some("cmd") | Some("bat")
    );
    if needs_shell {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&config.command);
        cmd
    } else {
        Command::new(&config.command)
    }
}

#[cfg(not(windows))]
fn build_command(config: &ResolvedConfig) -> Command {
    let _ = extension_of; // only meaningful on Windows; kept importable everywhere
    Command::new(&config.command)
}

/// Spawn the configured command with `["--help"]`, discarding all stdio, for
/// [`crate::probe::HealthProbe::probe`].
pub fn spawn_probe(config: &ResolvedConfig) -> Result<Child, AcpError> {
    let mut cmd = build_command(config);
    cmd.arg("--help");
    cmd.current_dir(&config.cwd);
    cmd.envs(&config.env);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());

    cmd.spawn()
        .map_err(|e| AcpError::Spawn(format!("{}: {e}", config.command)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_with_command(command: &str) -> ResolvedConfig {
        ResolvedConfig {
            command: command.to_string(),
            args: vec![],
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn spawn_missing_binary_returns_error_not_panic() {
        let config = config_with_command("/no/such/binary-xyz");
        let result = spawn(&config, &[]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn spawn_real_command_succeeds() {
        let command = if cfg!(windows) { "cmd" } else { "true" };
        let config = config_with_command(command);
        let mut child = spawn(&config, &[]).expect("spawn should succeed");
        let _ = child.wait().await;
    }

    #[tokio::test]
    async fn probe_missing_binary_returns_error() {
        let config = config_with_command("/no/such/binary-xyz");
        assert!(spawn_probe(&config).is_err());
    }
}
