//! Export hooks: child processes with a fixed environment contract.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Result, ViewerError};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A configured export hook.
#[derive(Debug, Clone)]
pub struct ExportHook {
    /// Shell command line, run via `sh -c`.
    pub command: String,
    pub timeout: Duration,
}

/// The environment contract passed to every hook.
#[derive(Debug, Clone)]
pub struct HookEnv<'a> {
    pub export_path: &'a Path,
    pub format: &'a str,
    pub issue_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Runs the hook to completion within its timeout. A non-zero exit fails
/// the export with the hook's stderr surfaced verbatim.
pub fn run_export_hook(hook: &ExportHook, env: &HookEnv<'_>) -> Result<()> {
    debug!(command = %hook.command, "hook.start");
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&hook.command)
        .env("BV_EXPORT_PATH", env.export_path)
        .env("BV_EXPORT_FORMAT", env.format)
        .env("BV_ISSUE_COUNT", env.issue_count.to_string())
        .env("BV_TIMESTAMP", env.timestamp.to_rfc3339())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| ViewerError::Hook(format!("cannot spawn `{}`: {err}", hook.command)))?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if started.elapsed() >= hook.timeout => {
                warn!(command = %hook.command, "hook.timeout");
                let _ = child.kill();
                let _ = child.wait();
                return Err(ViewerError::Hook(format!(
                    "`{}` timed out after {:?}",
                    hook.command, hook.timeout
                )));
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    };

    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }
    if !status.success() {
        return Err(ViewerError::Hook(format!(
            "`{}` exited with {}: {}",
            hook.command,
            status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }
    Ok(())
}
