// src/commands/mod.rs
//! Command handlers for the srcmirror CLI

mod archive;
mod init;
mod update;

pub use archive::{cmd_archive_add, cmd_archive_list, cmd_archive_remove};
pub use init::cmd_init;
pub use update::cmd_update;

use srcmirror::updater::PackageFailure;

/// Print per-package failures and turn them into an error exit
pub(crate) fn check_failures(what: &str, failed: &[PackageFailure]) -> anyhow::Result<()> {
    if failed.is_empty() {
        return Ok(());
    }
    println!("\nFailed packages:");
    for failure in failed {
        println!("  {}: {}", failure.package, failure.error);
    }
    Err(anyhow::anyhow!(
        "{} finished with {} failed package(s)",
        what,
        failed.len()
    ))
}
