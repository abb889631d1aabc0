//! Plugin installation
//!
//! Installing is fetch-then-place: the source is fetched into a scratch
//! directory, its manifest is read and validated, and the whole tree is
//! copied into a hidden staging directory inside the store root. Only once
//! the copy and the rewritten manifest are complete does the staging
//! directory replace `<root>/<name>`. Failures at any step drop the scratch
//! and staging directories, so the store never holds a half-written plugin.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{PluginError, Result};
use crate::utils::fs::copy_dir_all;

use super::fetch::Fetcher;
use super::store::PluginStore;
use super::types::{load_manifest, Plugin, MANIFEST_FILE};

/// Short names accepted in place of full locators for official plugins.
pub const OFFICIAL_PLUGINS: &[(&str, &str)] = &[
    ("kubectl", "github.com/aquasecurity/trivy-plugin-kubectl"),
    ("aqua", "github.com/aquasecurity/trivy-plugin-aqua"),
];

/// Expand an official short name into its repository locator.
pub fn resolve_source(source: &str) -> &str {
    OFFICIAL_PLUGINS
        .iter()
        .find(|(short, _)| *short == source)
        .map(|(_, full)| *full)
        .unwrap_or(source)
}

/// Whether `name` is an official short name.
pub fn is_official(name: &str) -> bool {
    OFFICIAL_PLUGINS.iter().any(|(short, _)| *short == name)
}

/// Fetches plugin sources and places them into the store.
#[derive(Clone)]
pub struct Installer {
    store: PluginStore,
    fetcher: Arc<dyn Fetcher>,
}

impl Installer {
    pub fn new(store: PluginStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &PluginStore {
        &self.store
    }

    /// Install a plugin from `source`.
    ///
    /// Without `force`, a plugin already installed from the same locator is
    /// returned as-is. With `force` the source is always fetched again and
    /// the installed copy replaced.
    pub async fn install(
        &self,
        source: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<Plugin> {
        let source = resolve_source(source);

        if !force {
            if let Some(existing) = self.store.find_by_repository(source) {
                info!(
                    plugin = %existing.name,
                    version = %existing.version,
                    "Plugin already installed, skipping"
                );
                return Ok(existing);
            }
        }

        info!(source = %source, "Installing the plugin");
        let fetched = tempfile::Builder::new()
            .prefix("plugin-fetch-")
            .tempdir()?;
        self.fetcher.fetch(source, fetched.path(), cancel).await?;

        debug!("Loading the plugin metadata");
        let mut plugin = load_manifest(fetched.path())?;
        plugin.validate()?;
        rewrite_platform_paths(&mut plugin)?;

        let dest = self.place(&plugin, fetched.path(), cancel).await?;
        info!(
            plugin = %plugin.name,
            version = %plugin.version,
            dir = %dest.display(),
            "Installed plugin"
        );
        Ok(plugin)
    }

    /// Copy the fetched tree into the store under the plugin's name.
    async fn place(
        &self,
        plugin: &Plugin,
        fetched: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let root = self.store.root();
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| PluginError::io_at(root, e))?;

        let staging = tempfile::Builder::new()
            .prefix(".install-")
            .tempdir_in(root)
            .map_err(|e| PluginError::io_at(root, e))?;

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(PluginError::Cancelled(format!("install of '{}' cancelled", plugin.name)));
            }
            res = copy_dir_all(fetched, staging.path()) => res?,
        }

        let manifest_path = staging.path().join(MANIFEST_FILE);
        tokio::fs::write(&manifest_path, plugin.to_yaml()?)
            .await
            .map_err(|e| PluginError::io_at(&manifest_path, e))?;

        let dest = self.store.path(&plugin.name);
        match tokio::fs::remove_dir_all(&dest).await {
            Ok(()) => debug!(dir = %dest.display(), "Replaced existing plugin directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PluginError::io_at(&dest, e)),
        }
        // The staging guard's cleanup is a no-op once the directory is renamed.
        tokio::fs::rename(staging.path(), &dest)
            .await
            .map_err(|e| PluginError::io_at(&dest, e))?;

        Ok(dest)
    }
}

/// Rewrite every platform's `uri` and `bin` into `./`-prefixed paths
/// relative to the install directory. An empty `uri` takes the value of
/// `bin`.
pub fn rewrite_platform_paths(plugin: &mut Plugin) -> Result<()> {
    if plugin.platforms.is_empty() {
        return Err(PluginError::Manifest(format!(
            "plugin '{}' declares no platforms",
            plugin.name
        )));
    }
    for platform in &mut plugin.platforms {
        if platform.bin.is_empty() {
            return Err(PluginError::Manifest(format!(
                "plugin '{}' has a platform without 'bin'",
                plugin.name
            )));
        }
        platform.bin = install_relative(&platform.bin)?;
        platform.uri = if platform.uri.is_empty() {
            platform.bin.clone()
        } else {
            install_relative(&platform.uri)?
        };
    }
    Ok(())
}

/// Normalize a manifest path into `./a/b` form, rejecting anything that
/// would resolve outside the install directory.
fn install_relative(path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => {
                return Err(PluginError::Manifest(format!(
                    "'{}' must be a relative path inside the plugin directory",
                    path
                )))
            }
        }
    }
    if parts.is_empty() {
        return Err(PluginError::Manifest(format!(
            "'{}' does not name a file",
            path
        )));
    }
    Ok(format!("./{}", parts.join("/")))
}
