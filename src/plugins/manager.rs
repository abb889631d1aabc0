//! Plugin lifecycle operations
//!
//! `PluginManager` ties the store, installer and executor together behind
//! the operations the CLI exposes: install, uninstall, update, run,
//! information and list.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::{PluginError, Result};

use super::executor::{self, RunOptions};
use super::fetch::{Fetcher, SourceFetcher};
use super::installer::Installer;
use super::platform::Target;
use super::store::PluginStore;
use super::types::Plugin;

/// Entry point for every plugin lifecycle operation.
///
/// # Example
///
/// ```rust,no_run
/// use tokio_util::sync::CancellationToken;
/// use trivy_plugin::config::Config;
/// use trivy_plugin::plugins::{PluginManager, RunOptions};
///
/// # async fn demo() -> trivy_plugin::error::Result<()> {
/// let manager = PluginManager::new(&Config::from_env());
/// let cancel = CancellationToken::new();
///
/// manager.install("kubectl", false, &cancel).await?;
/// manager
///     .run("kubectl", &RunOptions::with_args(["deployment/app"]), &cancel)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PluginManager {
    store: PluginStore,
    installer: Installer,
    target: Target,
}

impl PluginManager {
    /// Create a manager for the configured store, fetching with
    /// `SourceFetcher` and running for the current target.
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            PluginStore::from_config(config),
            Arc::new(SourceFetcher::new()),
            Target::current(),
        )
    }

    /// Create a manager from explicit parts.
    pub fn with_parts(store: PluginStore, fetcher: Arc<dyn Fetcher>, target: Target) -> Self {
        let installer = Installer::new(store.clone(), fetcher);
        Self {
            store,
            installer,
            target,
        }
    }

    /// Replace the effective target used to pick platforms.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn store(&self) -> &PluginStore {
        &self.store
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn load(&self, name: &str) -> Result<Plugin> {
        self.store.load(name)
    }

    pub fn load_all(&self) -> Result<Vec<Plugin>> {
        self.store.load_all()
    }

    /// Install a plugin from a source locator or official short name.
    pub async fn install(
        &self,
        source: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<Plugin> {
        self.installer.install(source, force, cancel).await
    }

    /// Remove an installed plugin.
    pub fn uninstall(&self, name: &str) -> Result<()> {
        info!(plugin = %name, "Uninstalling plugin");
        self.store.remove(name)
    }

    /// Re-install a plugin from the repository it records.
    ///
    /// The source is always fetched again. Versions are not compared, so
    /// an "older" version string still replaces the installed one.
    pub async fn update(&self, name: &str, cancel: &CancellationToken) -> Result<Plugin> {
        let current = self.store.load(name).map_err(|e| match e {
            PluginError::NotFound(msg) => {
                PluginError::NotFound(format!("plugin load error: {}", msg))
            }
            PluginError::Manifest(msg) => {
                PluginError::Manifest(format!("plugin load error: {}", msg))
            }
            other => other,
        })?;
        info!(plugin = %name, "Updating plugin");

        let updated = self
            .installer
            .install(&current.repository, true, cancel)
            .await?;

        if updated.version == current.version {
            info!(
                plugin = %name,
                version = %current.version,
                "The plugin is the latest version"
            );
        } else {
            info!(
                "Updated '{}' from {} to {}",
                name, current.version, updated.version
            );
        }
        Ok(updated)
    }

    /// Human-readable description of one installed plugin.
    pub fn information(&self, name: &str) -> Result<String> {
        let plugin = self.store.load(name).map_err(|_| {
            PluginError::NotFound(format!(
                "could not find a plugin called '{}', did you install it?",
                name
            ))
        })?;
        Ok(format!(
            "\nPlugin: {}\n  Description: {}\n  Version:     {}\n  Usage:       {}\n",
            plugin.name, plugin.description, plugin.version, plugin.usage
        ))
    }

    /// Summary of all installed plugins.
    pub fn list(&self) -> Result<String> {
        if !self.store.root().exists() {
            return Ok("No Installed Plugins\n".to_string());
        }
        let plugins = self.store.load_all()?;
        let mut lines = vec!["Installed Plugins:".to_string()];
        for plugin in &plugins {
            lines.push(format!(
                "  Name:    {}\n  Version: {}\n",
                plugin.name, plugin.version
            ));
        }
        Ok(lines.join("\n"))
    }

    /// Run an installed plugin by name, from the directory it was loaded
    /// from.
    pub async fn run(
        &self,
        name: &str,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let plugin = self.store.load(name)?;
        let dir = self.store.checked_path(name)?;
        executor::run(&plugin, &dir, &self.target, options, cancel).await
    }

    /// Run an already loaded plugin from the store directory named after it.
    pub async fn run_plugin(
        &self,
        plugin: &Plugin,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let dir = self.store.path(&plugin.name);
        executor::run(plugin, &dir, &self.target, options, cancel).await
    }

    /// Install the plugin at `source` unless already installed, then run it.
    pub async fn run_with_args(
        &self,
        source: &str,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let plugin = self.installer.install(source, false, cancel).await?;
        self.run_plugin(&plugin, options, cancel).await
    }
}
