//! Plugin manifest types
//!
//! This module defines the in-memory form of a plugin's `plugin.yaml`
//! manifest, along with decoding, encoding and validation.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};

/// File name of the manifest inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.yaml";

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]{0,127}$").expect("valid name pattern"));

/// Whether `name` can be used as a plugin directory name: no separators,
/// no leading `.`, at most 128 characters.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// A plugin as declared by its manifest.
///
/// # Example
///
/// ```yaml
/// name: kubectl
/// repository: github.com/aquasecurity/trivy-plugin-kubectl
/// version: "0.1.0"
/// usage: scan kubectl resources
/// description: A Trivy plugin that scans the images of a kubernetes resource.
/// platforms:
///   - selector:
///       os: linux
///       arch: amd64
///     uri: ./trivy-kubectl
///     bin: ./trivy-kubectl
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    /// Unique plugin name, also the name of its store directory.
    pub name: String,

    /// Source locator used for install and update.
    #[serde(default)]
    pub repository: String,

    /// Free-form version string. Never compared semantically.
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub usage: String,

    #[serde(default)]
    pub description: String,

    /// Platform variants in declaration order. Order is significant.
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

/// One OS/architecture-specific build of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Matching constraint. `None` matches every target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,

    /// Location of the executable asset, relative to the install root.
    #[serde(default)]
    pub uri: String,

    /// Path of the file to invoke, relative to the install root.
    #[serde(default)]
    pub bin: String,
}

/// OS and architecture constraint on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
}

impl Plugin {
    /// Decode manifest bytes.
    pub fn from_yaml(bytes: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(bytes)
            .map_err(|e| PluginError::Manifest(format!("yaml decode error: {}", e)))
    }

    /// Encode the plugin back into manifest form.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| PluginError::Manifest(format!("yaml encode error: {}", e)))
    }

    /// Check that the plugin name can safely be used as a directory name.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PluginError::Manifest("'name' is empty".to_string()));
        }
        if !is_valid_name(&self.name) {
            return Err(PluginError::Manifest(format!(
                "invalid plugin name '{}': must be 1-128 characters of letters, digits, '.', '_' or '-', starting with a letter or digit",
                self.name
            )));
        }
        Ok(())
    }
}

/// Read and decode `plugin.yaml` from a directory.
pub fn load_manifest(dir: &Path) -> Result<Plugin> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = fs::read(&path).map_err(|e| {
        PluginError::Manifest(format!("file open error: {}: {}", path.display(), e))
    })?;
    Plugin::from_yaml(&bytes)
}
