//! End-to-end plugin lifecycle: install, run, update, uninstall.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use trivy_plugin::plugins::{
    Platform, PluginManager, PluginStore, RunOptions, Selector, SourceFetcher, Target,
};
use trivy_plugin::{Config, PluginError};

fn test_plugin_manifest(name: &str, version: &str) -> String {
    format!(
        r#"name: "{name}"
repository: github.com/aquasecurity/trivy-plugin-test
version: "{version}"
usage: test
description: test
platforms:
  - selector:
      os: linux
      arch: amd64
    uri: test.sh
    bin: test.sh
"#
    )
}

/// Create a plugin source directory with a manifest and a script.
fn plugin_source(parent: &Path, name: &str, version: &str, script: &str) -> String {
    let dir = parent.join(format!("{}-src", name));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("plugin.yaml"), test_plugin_manifest(name, version)).unwrap();
    let script_path = dir.join("test.sh");
    fs::write(&script_path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755)).unwrap();
    dir.to_string_lossy().into_owned()
}

fn manager(data_home: &Path, target: Target) -> PluginManager {
    let config = Config::new(data_home);
    PluginManager::with_parts(
        PluginStore::from_config(&config),
        Arc::new(SourceFetcher::new()),
        target,
    )
}

fn linux_amd64() -> Target {
    Target::new("linux", "amd64")
}

#[tokio::test]
async fn install_then_load_rewrites_paths() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let source = plugin_source(work.path(), "test_plugin", "0.1.0", "exit 0");
    let m = manager(data_home.path(), linux_amd64());

    let installed = m
        .install(&source, false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        installed.platforms,
        vec![Platform {
            selector: Some(Selector {
                os: "linux".into(),
                arch: "amd64".into(),
            }),
            uri: "./test.sh".into(),
            bin: "./test.sh".into(),
        }]
    );
    assert!(data_home
        .path()
        .join(".trivy/plugins/test_plugin/test.sh")
        .is_file());
    assert_eq!(m.load("test_plugin").unwrap(), installed);
    assert_eq!(m.load_all().unwrap(), vec![installed]);
}

#[tokio::test]
async fn install_is_idempotent() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let source = plugin_source(work.path(), "test_plugin", "0.1.0", "exit 0");
    let m = manager(data_home.path(), linux_amd64());
    let cancel = CancellationToken::new();

    let first = m.install(&source, false, &cancel).await.unwrap();
    let second = m.install(&source, false, &cancel).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(m.load_all().unwrap().len(), 1);
}

#[tokio::test]
async fn install_from_missing_source() {
    let data_home = TempDir::new().unwrap();
    let m = manager(data_home.path(), linux_amd64());
    let missing = data_home.path().join("not_found");

    let err = m
        .install(&missing.to_string_lossy(), false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::Fetch(_)));
    assert!(err
        .to_string()
        .to_lowercase()
        .contains("no such file or directory"));
}

#[tokio::test]
async fn install_without_manifest() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let source = work.path().join("no_yaml");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("test.sh"), "#!/bin/sh\n").unwrap();

    let err = manager(data_home.path(), linux_amd64())
        .install(&source.to_string_lossy(), false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::Manifest(_)));
    assert!(err.to_string().contains("file open error"));
}

#[tokio::test]
async fn run_selects_platform_by_target() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let source = plugin_source(work.path(), "test_plugin", "0.1.0", "exit 0");
    let cancel = CancellationToken::new();

    let linux = manager(data_home.path(), linux_amd64());
    linux.install(&source, false, &cancel).await.unwrap();
    linux
        .run("test_plugin", &RunOptions::default(), &cancel)
        .await
        .unwrap();

    let darwin = manager(data_home.path(), Target::new("darwin", "amd64"));
    let err = darwin
        .run("test_plugin", &RunOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::PlatformNotFound { .. }));
    assert!(err.to_string().contains("platform not found"));
}

#[tokio::test]
async fn run_reports_exit_status() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let source = plugin_source(work.path(), "error_plugin", "0.1.0", "exit 1");
    let m = manager(data_home.path(), linux_amd64());
    let cancel = CancellationToken::new();

    m.install(&source, false, &cancel).await.unwrap();
    let err = m
        .run("error_plugin", &RunOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::Exec { .. }));
    assert!(err.to_string().contains("exit status 1"));
}

#[tokio::test]
async fn run_with_args_installs_on_demand() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let out = work.path().join("args.txt");
    let source = plugin_source(
        work.path(),
        "test_plugin",
        "0.1.0",
        &format!(r#"echo "$@" > "{}""#, out.display()),
    );
    let m = manager(data_home.path(), linux_amd64());

    m.run_with_args(
        &source,
        &RunOptions::with_args(["--format", "json"]),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "--format json");
    assert!(m.load("test_plugin").is_ok());
}

#[tokio::test]
async fn update_replaces_version_without_comparison() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let m = manager(data_home.path(), linux_amd64());
    let cancel = CancellationToken::new();

    // Installed copy claims a newer version than the source now provides.
    let source = plugin_source(work.path(), "test_plugin", "0.0.5", "exit 0");
    let plugin_dir = m.store().path("test_plugin");
    fs::create_dir_all(&plugin_dir).unwrap();
    fs::write(
        plugin_dir.join("plugin.yaml"),
        format!(
            "name: \"test_plugin\"\nrepository: {}\nversion: \"1.0.0\"\nusage: test\ndescription: A simple test plugin",
            source
        ),
    )
    .unwrap();
    assert_eq!(m.load("test_plugin").unwrap().version, "1.0.0");

    let updated = m.update("test_plugin", &cancel).await.unwrap();
    assert_eq!(updated.version, "0.0.5");
    assert_eq!(m.load("test_plugin").unwrap().version, "0.0.5");
    assert!(plugin_dir.join("test.sh").is_file());
}

#[tokio::test]
async fn uninstall_removes_plugin() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let source = plugin_source(work.path(), "test_plugin", "0.1.0", "exit 0");
    let m = manager(data_home.path(), linux_amd64());

    m.install(&source, false, &CancellationToken::new())
        .await
        .unwrap();
    m.uninstall("test_plugin").unwrap();

    assert!(!m.store().path("test_plugin").exists());
    assert!(m.load("test_plugin").is_err());
    assert!(m.load_all().unwrap().is_empty());
    assert!(m
        .information("test_plugin")
        .unwrap_err()
        .to_string()
        .contains("could not find a plugin called 'test_plugin'"));
}

#[tokio::test]
async fn list_after_install() {
    let work = TempDir::new().unwrap();
    let data_home = TempDir::new().unwrap();
    let m = manager(data_home.path(), linux_amd64());
    assert_eq!(m.list().unwrap(), "No Installed Plugins\n");

    let source = plugin_source(work.path(), "test_plugin", "0.1.0", "exit 0");
    m.install(&source, false, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        m.list().unwrap(),
        "Installed Plugins:\n  Name:    test_plugin\n  Version: 0.1.0\n"
    );
}
