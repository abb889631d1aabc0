//! Plugin source retrieval
//!
//! The installer does not care how a plugin gets onto disk, only that a
//! directory containing `plugin.yaml` and its assets appears. `Fetcher` is
//! that seam. `SourceFetcher` handles the two source kinds the CLI accepts:
//! local directories, which are copied, and git repositories, which are
//! shallow-cloned.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{PluginError, Result};
use crate::utils::fs::copy_dir_all;

/// Retrieves a plugin source into a local directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Place the contents of `source` into `dst`. `dst` exists and is empty.
    async fn fetch(&self, source: &str, dst: &Path, cancel: &CancellationToken) -> Result<()>;
}

/// Kind of source a locator refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A directory on the local filesystem.
    Local(String),
    /// A git repository URL, ready to pass to `git clone`.
    Git(String),
}

impl Source {
    /// Classify a locator.
    ///
    /// Existing local paths always win. `git::` prefixes are stripped and
    /// bare host paths such as `github.com/org/repo` get an `https://`
    /// scheme. Anything else is treated as a local path.
    pub fn parse(locator: &str) -> Self {
        let locator = locator.strip_prefix("file://").unwrap_or(locator);
        if Path::new(locator).exists() {
            return Source::Local(locator.to_string());
        }
        if let Some(url) = locator.strip_prefix("git::") {
            return Source::Git(url.to_string());
        }
        if locator.starts_with("https://")
            || locator.starts_with("http://")
            || locator.starts_with("ssh://")
            || locator.starts_with("git@")
        {
            return Source::Git(locator.to_string());
        }
        if looks_like_host_path(locator) {
            return Source::Git(format!("https://{}", locator));
        }
        Source::Local(locator.to_string())
    }
}

/// `github.com/org/repo` style: a dotted host followed by a path.
fn looks_like_host_path(locator: &str) -> bool {
    match locator.split_once('/') {
        Some((host, rest)) => {
            !host.is_empty()
                && host.contains('.')
                && !host.starts_with('.')
                && !rest.is_empty()
        }
        None => false,
    }
}

/// Default fetcher: copies local directories and clones git repositories.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    git_binary: String,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self {
            git_binary: "git".to_string(),
        }
    }

    /// Use a specific git executable.
    pub fn with_git_binary(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    async fn copy_local(&self, path: &str, dst: &Path, cancel: &CancellationToken) -> Result<()> {
        let src = Path::new(path);
        let meta = tokio::fs::metadata(src)
            .await
            .map_err(|e| PluginError::Fetch(format!("{}: {}", path, e)))?;
        if !meta.is_dir() {
            return Err(PluginError::Fetch(format!("{}: not a directory", path)));
        }

        debug!(source = %path, dst = %dst.display(), "Copying local plugin source");
        tokio::select! {
            _ = cancel.cancelled() => Err(PluginError::Cancelled(format!("fetch of {} cancelled", path))),
            res = copy_dir_all(src, dst) => {
                res.map_err(|e| PluginError::Fetch(format!("failed to copy {}: {}", path, e)))
            }
        }
    }

    async fn clone_git(&self, url: &str, dst: &Path, cancel: &CancellationToken) -> Result<()> {
        debug!(url = %url, dst = %dst.display(), "Cloning plugin repository");

        let mut child = Command::new(&self.git_binary)
            .args(["clone", "--quiet", "--depth", "1", url])
            .arg(dst)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PluginError::Fetch(format!("failed to run {}: {}", self.git_binary, e))
            })?;

        let stderr = child.stderr.take();
        let read_stderr = async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(PluginError::Cancelled(format!("clone of {} cancelled", url)))
            }
            (status, stderr) = async { tokio::join!(child.wait(), read_stderr) } => {
                let status = status.map_err(|e| PluginError::Fetch(format!("git clone {}: {}", url, e)))?;
                if status.success() {
                    Ok(())
                } else {
                    Err(PluginError::Fetch(format!(
                        "git clone {} failed ({}): {}",
                        url,
                        status,
                        stderr.trim()
                    )))
                }
            }
        }
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for SourceFetcher {
    async fn fetch(&self, source: &str, dst: &Path, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(PluginError::Cancelled(format!("fetch of {} cancelled", source)));
        }
        match Source::parse(source) {
            Source::Local(path) => self.copy_local(&path, dst, cancel).await,
            Source::Git(url) => self.clone_git(&url, dst, cancel).await,
        }
    }
}
