//! Plugin execution
//!
//! Runs the platform variant of an installed plugin that matches the
//! effective target. The child inherits the caller's stdin, stdout, stderr
//! and environment untouched. Cancellation kills the child.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{PluginError, Result};

use super::platform::{select_platform, Target};
use super::types::Plugin;

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Arguments appended after the plugin binary.
    pub args: Vec<String>,
    /// Extra environment variables on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl RunOptions {
    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Resolve the platform binary for `target` to an absolute path under
/// `plugin_dir`.
pub fn resolve_bin(plugin: &Plugin, plugin_dir: &Path, target: &Target) -> Result<PathBuf> {
    let platform = select_platform(&plugin.platforms, target)?;
    let bin = plugin_dir.join(platform.bin.trim_start_matches("./"));
    std::path::absolute(&bin).map_err(|e| PluginError::io_at(&bin, e))
}

/// Run an installed plugin and wait for it to finish.
///
/// # Errors
/// - `PluginError::PlatformNotFound` if no platform matches `target`
/// - `PluginError::Io` if the binary is missing or cannot be spawned
/// - `PluginError::Exec` if the plugin exits unsuccessfully
/// - `PluginError::Cancelled` if `cancel` fires first; the child is killed
pub async fn run(
    plugin: &Plugin,
    plugin_dir: &Path,
    target: &Target,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let bin = resolve_bin(plugin, plugin_dir, target)?;

    let meta = tokio::fs::metadata(&bin)
        .await
        .map_err(|e| PluginError::io_at(&bin, e))?;
    if !meta.is_file() {
        return Err(PluginError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{}: not a regular file", bin.display()),
        )));
    }

    debug!(
        plugin = %plugin.name,
        bin = %bin.display(),
        target = %target,
        args = options.args.len(),
        "Running plugin"
    );

    let mut child = Command::new(&bin)
        .args(&options.args)
        .envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| PluginError::io_at(&bin, e))?;

    tokio::select! {
        _ = cancel.cancelled() => {
            warn!(plugin = %plugin.name, "Cancelling plugin process");
            if let Err(e) = child.kill().await {
                warn!(plugin = %plugin.name, error = %e, "Failed to kill plugin process");
            }
            Err(PluginError::Cancelled(format!("plugin '{}' was cancelled", plugin.name)))
        }
        status = child.wait() => {
            let status = status.map_err(|e| PluginError::io_at(&bin, e))?;
            check_status(&plugin.name, status)
        }
    }
}

fn check_status(name: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    let description = match status.code() {
        Some(code) => format!("exit status {}", code),
        None => signal_description(status),
    };
    Err(PluginError::Exec {
        name: name.to_string(),
        status: description,
        code: status.code(),
    })
}

#[cfg(unix)]
fn signal_description(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(sig) => format!("signal: {}", sig),
        None => status.to_string(),
    }
}

#[cfg(not(unix))]
fn signal_description(status: ExitStatus) -> String {
    status.to_string()
}
