//! On-disk plugin store
//!
//! Every installed plugin lives in its own subdirectory of the store root,
//! named after the plugin, with its `plugin.yaml` at the top:
//!
//! ```text
//! ~/.trivy/plugins/
//! ├── kubectl/
//! │   ├── plugin.yaml
//! │   └── trivy-kubectl
//! └── aqua/
//!     ├── plugin.yaml
//!     └── aqua
//! ```
//!
//! Directories whose name starts with `.` are staging areas used by the
//! installer and are never reported as plugins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{PluginError, Result};

use super::types::{is_valid_name, load_manifest, Plugin, MANIFEST_FILE};

/// Filesystem layout and enumeration of installed plugins.
#[derive(Debug, Clone)]
pub struct PluginStore {
    root: PathBuf,
}

impl PluginStore {
    /// Create a store rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the configured location.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.plugins_dir())
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the named plugin. Pure path computation.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Directory of the named plugin, refusing names that would resolve
    /// outside the store root (`..`, separators, absolute paths).
    pub fn checked_path(&self, name: &str) -> Result<PathBuf> {
        if !is_valid_name(name) {
            return Err(PluginError::NotFound(format!(
                "'{}' is not a valid plugin name",
                name
            )));
        }
        Ok(self.path(name))
    }

    /// Load a single installed plugin by name.
    ///
    /// # Errors
    /// - `PluginError::NotFound` if the plugin directory or its manifest is absent
    /// - `PluginError::Manifest` if the manifest cannot be read or decoded
    pub fn load(&self, name: &str) -> Result<Plugin> {
        let dir = self.checked_path(name)?;
        if !dir.is_dir() {
            return Err(PluginError::NotFound(format!(
                "plugin '{}' is not installed ({})",
                name,
                dir.display()
            )));
        }
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(PluginError::NotFound(format!(
                "no {} found in {}",
                MANIFEST_FILE,
                dir.display()
            )));
        }
        load_manifest(&dir)
    }

    /// Load every installed plugin, sorted by directory name.
    ///
    /// Fails if the root cannot be listed. A single plugin failing to load
    /// aborts the whole enumeration.
    pub fn load_all(&self) -> Result<Vec<Plugin>> {
        let entries = fs::read_dir(&self.root).map_err(|e| PluginError::io_at(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PluginError::io_at(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();

        let mut plugins = Vec::with_capacity(names.len());
        for name in names {
            let plugin = self.load(&name)?;
            debug!(plugin = %plugin.name, version = %plugin.version, "Loaded plugin");
            plugins.push(plugin);
        }
        Ok(plugins)
    }

    /// Remove the named plugin's directory. A missing directory counts as
    /// removed.
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.checked_path(name)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!(plugin = %name, dir = %dir.display(), "Removed plugin directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PluginError::io_at(&dir, e)),
        }
    }

    /// The installed plugin that records `repository` as its source.
    ///
    /// A missing store root means nothing is installed. A store that cannot
    /// be fully enumerated is treated the same way, so one broken plugin
    /// directory never blocks installing another.
    pub fn find_by_repository(&self, repository: &str) -> Option<Plugin> {
        if !self.root.is_dir() {
            return None;
        }
        match self.load_all() {
            Ok(plugins) => plugins.into_iter().find(|p| p.repository == repository),
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Failed to enumerate installed plugins");
                None
            }
        }
    }
}
