// src/cli/archive.rs
//! Sticky suite commands

use super::SyncArgs;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// List suites of the archive mirror and which of them are sticky
    List {
        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Make a suite of the archive mirror sticky, extracting what is missing
    ///
    /// Only archived releases (e.g. woody, lenny) can be added; suites still
    /// present on the live mirror are handled by `update`.
    Add {
        /// Suite name
        suite: String,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Drop a sticky suite, removing versions no other suite needs
    Remove {
        /// Suite name
        suite: String,

        #[command(flatten)]
        sync: SyncArgs,
    },
}
