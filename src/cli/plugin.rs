//! Plugin subcommand handlers.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use trivy_plugin::plugins::{PluginManager, RunOptions};

/// Token cancelled on Ctrl-C, so a running plugin or fetch is torn down
/// instead of outliving the CLI.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}

pub(crate) async fn cmd_install(manager: &PluginManager, source: &str, force: bool) -> Result<()> {
    let plugin = manager.install(source, force, &interrupt_token()).await?;
    println!("Installed plugin '{}' ({})", plugin.name, plugin.version);
    Ok(())
}

pub(crate) fn cmd_uninstall(manager: &PluginManager, name: &str) -> Result<()> {
    manager.uninstall(name)?;
    println!("Uninstalled plugin '{}'", name);
    Ok(())
}

pub(crate) async fn cmd_update(manager: &PluginManager, name: &str) -> Result<()> {
    manager.update(name, &interrupt_token()).await?;
    Ok(())
}

pub(crate) async fn cmd_run(manager: &PluginManager, name: &str, args: Vec<String>) -> Result<()> {
    let options = RunOptions::with_args(args);
    manager.run(name, &options, &interrupt_token()).await?;
    Ok(())
}

pub(crate) async fn cmd_exec(manager: &PluginManager, source: &str, args: Vec<String>) -> Result<()> {
    let options = RunOptions::with_args(args);
    manager
        .run_with_args(source, &options, &interrupt_token())
        .await?;
    Ok(())
}

pub(crate) fn cmd_info(manager: &PluginManager, name: &str) -> Result<()> {
    print!("{}", manager.information(name)?);
    Ok(())
}

pub(crate) fn cmd_list(manager: &PluginManager) -> Result<()> {
    println!("{}", manager.list()?);
    Ok(())
}
