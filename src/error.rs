//! Error types for the plugin manager
//!
//! Every component returns these errors to its caller unchanged. Only the
//! binary converts them into user-facing text and exit codes. Uses
//! `thiserror` for the `Display` and `Error` implementations.

use std::path::Path;

use thiserror::Error;

/// The primary error type for plugin operations.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The plugin source could not be retrieved (missing path, failed clone).
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The manifest is missing, unreadable, malformed or invalid.
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// A plugin or file is absent from the store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No platform variant matches the effective target.
    #[error("platform not found: no platform matches {os}/{arch}")]
    PlatformNotFound { os: String, arch: String },

    /// Filesystem access failures, including a missing plugin executable.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The plugin process exited unsuccessfully.
    #[error("Exec error: plugin '{name}' failed: {status}")]
    Exec {
        name: String,
        status: String,
        /// Exit code when the process exited normally.
        code: Option<i32>,
    },

    /// The operation was cancelled by the caller.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl PluginError {
    /// Wrap an I/O error, prefixing the path it concerns while keeping the
    /// original error kind and OS message.
    pub fn io_at(path: &Path, err: std::io::Error) -> Self {
        PluginError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }

    /// Exit code the CLI should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PluginError::Exec { code: Some(code), .. } => *code,
            _ => 1,
        }
    }
}

/// A specialized `Result` type for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
