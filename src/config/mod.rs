//! Configuration for the plugin manager
//!
//! The only persistent setting is where plugins live. It is derived from a
//! per-user data home: `$XDG_DATA_HOME` when set, otherwise the user's home
//! directory. Plugins are stored under `<data-home>/.trivy/plugins`.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data home.
pub const DATA_HOME_ENV: &str = "XDG_DATA_HOME";

const PLUGINS_RELATIVE_DIR: [&str; 2] = [".trivy", "plugins"];

/// Resolved plugin manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    data_home: PathBuf,
}

impl Config {
    /// Create a configuration rooted at an explicit data home.
    pub fn new(data_home: impl Into<PathBuf>) -> Self {
        Self {
            data_home: data_home.into(),
        }
    }

    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(std::env::var(DATA_HOME_ENV).ok(), dirs::home_dir())
    }

    /// Pick the data home from an optional override and an optional home
    /// directory. Empty overrides are ignored.
    fn resolve(data_home: Option<String>, home: Option<PathBuf>) -> Self {
        match data_home.filter(|v| !v.is_empty()) {
            Some(dir) => Self::new(dir),
            None => Self::new(home.unwrap_or_else(|| PathBuf::from("."))),
        }
    }

    /// The data home all paths are derived from.
    pub fn data_home(&self) -> &Path {
        &self.data_home
    }

    /// Root directory of the plugin store.
    pub fn plugins_dir(&self) -> PathBuf {
        PLUGINS_RELATIVE_DIR
            .iter()
            .fold(self.data_home.clone(), |acc, part| acc.join(part))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugins_dir_layout() {
        let config = Config::new("/data");
        assert_eq!(config.plugins_dir(), PathBuf::from("/data/.trivy/plugins"));
    }

    #[test]
    fn test_override_wins_over_home() {
        let config = Config::resolve(Some("/xdg".into()), Some(PathBuf::from("/home/u")));
        assert_eq!(config.data_home(), Path::new("/xdg"));
    }

    #[test]
    fn test_empty_override_falls_back_to_home() {
        let config = Config::resolve(Some(String::new()), Some(PathBuf::from("/home/u")));
        assert_eq!(config.data_home(), Path::new("/home/u"));
    }

    #[test]
    fn test_no_home_uses_current_dir() {
        let config = Config::resolve(None, None);
        assert_eq!(config.plugins_dir(), PathBuf::from("./.trivy/plugins"));
    }
}
