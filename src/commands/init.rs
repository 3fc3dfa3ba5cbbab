// src/commands/init.rs

//! Database and store initialization

use anyhow::{Context, Result};
use srcmirror::SyncConfig;
use std::fs;
use tracing::info;

/// Create the database and the directories a run writes to
pub fn cmd_init(config: &SyncConfig) -> Result<()> {
    srcmirror::db::init(&config.db_path)?;

    for dir in [&config.sources_dir, &config.cache_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        info!("Using directory {}", dir.display());
    }

    println!("Database initialized at: {}", config.db_path.display());
    println!("Sources store: {}", config.sources_dir.display());
    Ok(())
}
