// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{ArchiveCommands, Cli, Commands};
use srcmirror::SyncConfig;
use tracing_subscriber::EnvFilter;

/// Log filter: RUST_LOG if set, else `-v` count, else the configured level
fn log_filter(verbose: u8, config: &SyncConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => config.log_filter(),
            1 => "debug",
            _ => "trace",
        })
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SyncConfig::load_or_default(cli.config.as_deref())?;
    match &cli.command {
        Some(Commands::Init { db_path }) => {
            if let Some(db_path) = db_path {
                config.db_path = db_path.into();
            }
        }
        Some(Commands::Update { sync })
        | Some(Commands::Archive(
            ArchiveCommands::List { sync }
            | ArchiveCommands::Add { sync, .. }
            | ArchiveCommands::Remove { sync, .. },
        )) => sync.apply(&mut config)?,
        None => {}
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, &config))
        .init();

    match cli.command {
        Some(Commands::Init { .. }) => commands::cmd_init(&config),
        Some(Commands::Update { .. }) => commands::cmd_update(config),
        Some(Commands::Archive(ArchiveCommands::List { .. })) => {
            commands::cmd_archive_list(config)
        }
        Some(Commands::Archive(ArchiveCommands::Add { suite, .. })) => {
            commands::cmd_archive_add(config, &suite)
        }
        Some(Commands::Archive(ArchiveCommands::Remove { suite, .. })) => {
            commands::cmd_archive_remove(config, &suite)
        }
        None => {
            println!("srcmirror v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'srcmirror --help' for usage information");
            Ok(())
        }
    }
}
