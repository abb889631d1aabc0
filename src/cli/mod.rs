//! Command handlers for the `trivy-plugin` binary.

mod plugin;

use anyhow::Result;

use trivy_plugin::plugins::{PluginManager, Target};
use trivy_plugin::Config;

use super::{Cli, Commands};

/// Build the manager from the environment and run the selected command.
pub(crate) async fn dispatch(cli: Cli) -> Result<()> {
    let target = Target::current_with(cli.target_os.as_deref(), cli.target_arch.as_deref());
    let manager = PluginManager::new(&Config::from_env()).with_target(target);

    match cli.command {
        Some(Commands::Version) | None => {
            println!("trivy-plugin {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Install { source, force }) => {
            plugin::cmd_install(&manager, &source, force).await
        }
        Some(Commands::Uninstall { name }) => plugin::cmd_uninstall(&manager, &name),
        Some(Commands::Update { name }) => plugin::cmd_update(&manager, &name).await,
        Some(Commands::Run { name, args }) => plugin::cmd_run(&manager, &name, args).await,
        Some(Commands::Exec { source, args }) => {
            plugin::cmd_exec(&manager, &source, args).await
        }
        Some(Commands::Info { name }) => plugin::cmd_info(&manager, &name),
        Some(Commands::List) => plugin::cmd_list(&manager),
    }
}
