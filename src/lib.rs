//! trivy-plugin - install, run, update and remove command-line plugins

pub mod config;
pub mod error;
pub mod plugins;
pub mod utils;

pub use config::Config;
pub use error::{PluginError, Result};
