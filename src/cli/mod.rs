// src/cli/mod.rs
//! CLI definitions for srcmirror
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `init` - Create the database and store directories
//! - `update` - Bring the sources store in line with the mirror
//! - `archive` - Manage sticky suites (list, add, remove)

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use srcmirror::config::{ForcedTrigger, Passes, Stage, SyncConfig};
use std::path::PathBuf;

mod archive;

pub use archive::ArchiveCommands;

#[derive(Parser)]
#[command(name = "srcmirror")]
#[command(author = "srcmirror Project")]
#[command(version)]
#[command(about = "Keep an extracted copy of a Debian source mirror", long_about = None)]
pub struct Cli {
    /// Configuration file (default: /etc/srcmirror/config.toml if present)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG wins if set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and the store directories
    Init {
        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,
    },

    /// Extract new packages, refresh suite mappings, collect gone packages
    Update {
        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Sticky suites kept after they leave the live mirror
    #[command(subcommand)]
    Archive(ArchiveCommands),
}

/// Run options shared by `update` and `archive`, layered over the config file
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Path to the database file
    #[arg(short, long)]
    pub db_path: Option<String>,

    /// Show what would change without touching the store or the database
    #[arg(long)]
    pub dry_run: bool,

    /// Only run these passes: db, fs, hooks, hooks.db, hooks.fs (or none)
    #[arg(short, long = "pass", value_name = "PASS")]
    pub passes: Vec<String>,

    /// Only run these stages: extract, suites, gc
    #[arg(short, long = "stage", value_name = "STAGE")]
    pub stages: Vec<String>,

    /// Hold the whole run in one transaction (yes) or commit per package (no)
    #[arg(long, value_name = "yes|no", value_parser = parse_yes_no)]
    pub single_transaction: Option<bool>,

    /// Re-run a hook on every package, as EVENT/HOOK (e.g. add-package/checksums)
    #[arg(short, long = "trigger", value_name = "EVENT/HOOK")]
    pub triggers: Vec<String>,

    /// Minimum age in days before a gone package is removed
    #[arg(long)]
    pub expire_days: Option<u32>,
}

impl SyncArgs {
    /// Override `config` with whatever was given on the command line
    pub fn apply(&self, config: &mut SyncConfig) -> Result<()> {
        if let Some(db_path) = &self.db_path {
            config.db_path = PathBuf::from(db_path);
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if !self.passes.is_empty() {
            config.passes = Passes::parse_list(&self.passes)?;
        }
        if !self.stages.is_empty() {
            config.stages = self
                .stages
                .iter()
                .map(|s| s.parse::<Stage>())
                .collect::<srcmirror::Result<_>>()?;
        }
        if let Some(single) = self.single_transaction {
            config.single_transaction = single;
        }
        for trigger in &self.triggers {
            let trigger: ForcedTrigger = trigger.parse()?;
            if !config.force_triggers.contains(&trigger) {
                config.force_triggers.push(trigger);
            }
        }
        if let Some(days) = self.expire_days {
            config.expire_days = days;
        }
        config.validate()?;
        Ok(())
    }
}

fn parse_yes_no(s: &str) -> std::result::Result<bool, String> {
    match s {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(format!("expected yes or no, got {}", other)),
    }
}
