//! Shell command execution for template builders.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::action::ActionError;

#[cfg(unix)]
const SHELL: (&str, &str) = ("/bin/sh", "-c");

#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd.exe", "/C");

/// Run a rendered command line through the platform shell.
///
/// The command inherits the caller's environment and runs in `cwd` when given.
/// Returns the trimmed stdout. On failure the trimmed stderr is kept in the
/// error.
pub fn execute_cmd(cmd: &str, cwd: Option<&Path>) -> Result<String, ActionError> {
  let (shell, flag) = SHELL;
  info!(cmd = %cmd, "executing command");
  debug!(shell, working_dir = ?cwd, "spawning process");

  let mut command = Command::new(shell);
  command.arg(flag).arg(cmd);
  if let Some(dir) = cwd {
    command.current_dir(dir);
  }
  let output = command.output()?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
  if !stderr.is_empty() {
    debug!(stderr = %stderr, "command stderr");
  }

  if !output.status.success() {
    warn!(cmd = %cmd, code = ?output.status.code(), "command failed");
    return Err(ActionError::CmdFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
      stderr,
    });
  }

  Ok(stdout)
}
