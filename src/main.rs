use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trivy_plugin::PluginError;

mod cli;

#[derive(Parser)]
#[command(name = "trivy-plugin")]
#[command(about = "Install, run, update and remove plugins", long_about = None)]
struct Cli {
    /// Override the OS used to select a plugin platform
    #[arg(long, global = true)]
    target_os: Option<String>,

    /// Override the architecture used to select a plugin platform
    #[arg(long, global = true)]
    target_arch: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a plugin from a local directory, git repository or official name
    #[command(alias = "i")]
    Install {
        /// Source locator (path, URL, or short name such as "kubectl")
        source: String,
        /// Re-fetch even if a plugin from this source is already installed
        #[arg(short, long)]
        force: bool,
    },
    /// Uninstall a plugin
    #[command(alias = "u", alias = "rm")]
    Uninstall { name: String },
    /// Re-install a plugin from the repository it was installed from
    Update { name: String },
    /// Run an installed plugin
    #[command(alias = "r")]
    Run {
        name: String,
        /// Arguments passed through to the plugin
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Install a plugin if needed, then run it
    Exec {
        source: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Show information about an installed plugin
    Info { name: String },
    /// List installed plugins
    #[command(alias = "ls")]
    List,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so plugin output on stdout stays clean
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = cli::dispatch(cli).await {
        let code = match err.downcast_ref::<PluginError>() {
            // The plugin has already reported its own failure.
            Some(e @ PluginError::Exec { code: Some(_), .. }) => e.exit_code(),
            Some(e) => {
                eprintln!("Error: {:#}", err);
                e.exit_code()
            }
            None => {
                eprintln!("Error: {:#}", err);
                1
            }
        };
        std::process::exit(code);
    }
}
