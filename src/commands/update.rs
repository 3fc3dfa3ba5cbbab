// src/commands/update.rs

//! Update command: sync the sources store with the mirror

use super::check_failures;
use anyhow::Result;
use srcmirror::{SourceMirror, SyncConfig, UpdateReport, Updater};
use tracing::info;

pub fn cmd_update(config: SyncConfig) -> Result<()> {
    config.warn_non_defaults();
    info!("Updating from mirror at {}", config.mirror_dir.display());

    let conn = srcmirror::db::open(&config.db_path)?;
    let mut mirror = SourceMirror::new(&config.mirror_dir);
    let updater = Updater::new(config)?;

    let report = updater.update(&conn, &mut mirror)?;
    print_report(&report);
    check_failures("update", &report.failed)
}

fn print_report(report: &UpdateReport) {
    if let Some(plan) = &report.plan {
        println!("Dry run, nothing changed.");
        println!("Would add {} package(s):", plan.to_add.len());
        for pkg in &plan.to_add {
            println!("  + {}", pkg);
        }
        println!("Would remove {} package(s):", plan.to_remove.len());
        for pkg in &plan.to_remove {
            println!("  - {}", pkg);
        }
        return;
    }

    println!("Update complete:");
    println!("  Added: {}", report.added.len());
    println!("  Removed: {}", report.removed.len());
    if report.excluded > 0 {
        println!("  Excluded: {}", report.excluded);
    }
    println!("  Suite mappings: {}", report.suite_mappings);
    if report.has_failures() {
        println!("  Failed: {}", report.failed.len());
    }
}
