//! Running package build commands.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use super::types::ExecuteError;

/// Run a package's build command in `cwd` through the platform shell.
///
/// The caller's environment is inherited, with `env` added on top plus a
/// fixed locale and `SOURCE_DATE_EPOCH` so builds are reproducible.
///
/// Returns the trimmed stdout on success.
pub async fn run_build(cmd: &str, cwd: &Path, env: &BTreeMap<String, OsString>) -> Result<String, ExecuteError> {
  info!(cmd = %cmd, cwd = %cwd.display(), "running build command");

  let (shell, shell_args) = shell();

  let mut command = Command::new(shell);
  command
    .args(shell_args)
    .arg(cmd)
    .current_dir(cwd)
    .env("LANG", "C")
    .env("LC_ALL", "C")
    // 315532800 = January 1, 1980 00:00:00 UTC (ZIP epoch)
    .env("SOURCE_DATE_EPOCH", "315532800")
    .envs(env);

  let output = command.output().await?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(ExecuteError::CmdFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
      stderr: stderr.trim().to_string(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Always `/bin/sh -c` on Unix, never `$SHELL`.
#[cfg(unix)]
fn shell() -> (&'static str, &'static [&'static str]) {
  ("/bin/sh", &["-c"])
}

#[cfg(windows)]
fn shell() -> (&'static str, &'static [&'static str]) {
  (
    "powershell.exe",
    &["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"],
  )
}
