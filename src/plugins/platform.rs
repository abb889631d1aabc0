//! Platform selection
//!
//! A plugin declares an ordered list of platform variants. The first variant
//! whose selector matches the effective target is the one that runs. A
//! variant without a selector matches every target, so manifest authors put
//! catch-all entries last.

use std::fmt;

use crate::error::{PluginError, Result};

use super::types::{Platform, Selector};

/// The OS/architecture pair used to pick a platform variant.
///
/// Names follow the plugin ecosystem's conventions (`linux`, `darwin`,
/// `amd64`, `arm64`, ...) rather than Rust's target names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub os: String,
    pub arch: String,
}

impl Target {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The target of the running system.
    pub fn current() -> Self {
        Self::new(
            os_name(std::env::consts::OS),
            arch_name(std::env::consts::ARCH),
        )
    }

    /// The current target with either half replaced when an override is
    /// given. Empty overrides are ignored.
    pub fn current_with(os: Option<&str>, arch: Option<&str>) -> Self {
        let current = Self::current();
        Self {
            os: os
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(current.os),
            arch: arch
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(current.arch),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn os_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

/// Whether a selector accepts the target. An absent selector matches
/// everything; otherwise OS and arch must both be equal, case-sensitively.
pub fn matches(selector: Option<&Selector>, target: &Target) -> bool {
    match selector {
        None => true,
        Some(s) => s.os == target.os && s.arch == target.arch,
    }
}

/// Return the first platform, in declaration order, that matches the target.
pub fn select_platform<'a>(platforms: &'a [Platform], target: &Target) -> Result<&'a Platform> {
    platforms
        .iter()
        .find(|p| matches(p.selector.as_ref(), target))
        .ok_or_else(|| PluginError::PlatformNotFound {
            os: target.os.clone(),
            arch: target.arch.clone(),
        })
}
