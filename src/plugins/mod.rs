//! Plugin system
//!
//! A plugin is a directory holding a `plugin.yaml` manifest and one or more
//! platform-specific executables. Plugins are installed from a local
//! directory or a git repository into the store, one subdirectory each, and
//! run as child processes with the caller's stdio.
//!
//! # Architecture
//!
//! - **types**: manifest model (`Plugin`, `Platform`, `Selector`)
//! - **platform**: `Target` and first-match platform selection
//! - **store**: on-disk layout, loading and removal
//! - **fetch**: `Fetcher` seam and the default local/git `SourceFetcher`
//! - **installer**: fetch-then-place installation
//! - **executor**: child process execution with cancellation
//! - **manager**: `PluginManager`, the lifecycle facade used by the CLI
//!
//! # Example plugin.yaml
//!
//! ```yaml
//! name: kubectl
//! repository: github.com/aquasecurity/trivy-plugin-kubectl
//! version: "0.1.0"
//! usage: scan kubectl resources
//! description: A Trivy plugin that scans the images of a kubernetes resource.
//! platforms:
//!   - selector:
//!       os: darwin
//!       arch: amd64
//!     uri: ./trivy-kubectl
//!     bin: ./trivy-kubectl
//!   - selector:
//!       os: linux
//!       arch: amd64
//!     uri: ./trivy-kubectl
//!     bin: ./trivy-kubectl
//! ```

pub mod executor;
pub mod fetch;
pub mod installer;
pub mod manager;
pub mod platform;
pub mod store;
pub mod types;

pub use executor::RunOptions;
pub use fetch::{Fetcher, SourceFetcher};
pub use installer::Installer;
pub use manager::PluginManager;
pub use platform::{select_platform, Target};
pub use store::PluginStore;
pub use types::{Platform, Plugin, Selector, MANIFEST_FILE};
