use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watchkeep_config::ConfigLoader;

mod commands;
mod host;

use host::Host;

#[derive(Parser)]
#[command(
    name = "watchkeepctl",
    version,
    about = "Inspect, migrate and seed watchkeep progress stores"
)]
struct Cli {
    /// Config file (TOML or JSON); defaults to $WATCHKEEP_CONFIG_PATH or
    /// ./watchkeep.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the store files; overrides the config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the stored version and payload without migrating
    Show,
    /// Load the store, migrating it to the latest version, and print it
    Load {
        /// Skip background reconciliation of legacy history
        #[arg(long)]
        no_reconcile: bool,
        /// Migrate legacy history even when it cannot be reconciled,
        /// dropping it
        #[arg(long)]
        discard_legacy: bool,
    },
    /// Seed the store with a flat legacy history file (version 1)
    ImportLegacy {
        /// JSON file holding `{"items": [...]}` or a bare item array
        file: PathBuf,
        /// Replace existing data
        #[arg(long)]
        force: bool,
    },
    /// Replace stored data with an empty payload at the latest version
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut load = ConfigLoader::from_process_env()?
        .with_path(cli.config)
        .load()?;
    if let Some(dir) = cli.data_dir {
        load.config.store.data_dir = dir;
    }
    let host = Host::new(load.config);

    match cli.command {
        Command::Show => commands::show(&host),
        Command::Load {
            no_reconcile,
            discard_legacy,
        } => commands::load(&host, !no_reconcile, discard_legacy).await,
        Command::ImportLegacy { file, force } => {
            commands::import_legacy(&host, &file, force)
        }
        Command::Reset { yes } => commands::reset(&host, yes),
    }
}
