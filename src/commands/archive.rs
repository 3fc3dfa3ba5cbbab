// src/commands/archive.rs

//! Sticky suite commands
//!
//! All three operate on the archive mirror (`archive_dir`, falling back to
//! `mirror_dir`).

use super::check_failures;
use anyhow::Result;
use srcmirror::{ArchiveReport, Archiver, SourceMirror, SyncConfig, Updater};

/// List archive mirror suites and their sticky status
pub fn cmd_archive_list(config: SyncConfig) -> Result<()> {
    let conn = srcmirror::db::open(&config.db_path)?;
    let archive = SourceMirror::new(config.archive_dir());
    let updater = Updater::new(config)?;

    let suites = Archiver::new(&updater).list_suites(&conn, &archive)?;
    if suites.is_empty() {
        println!("No suites found in {}", archive.root().display());
        return Ok(());
    }

    println!("{:<16} {:<8} {:<8}", "SUITE", "ARCHIVE", "STICKY");
    for (suite, status) in &suites {
        println!(
            "{:<16} {:<8} {:<8}",
            suite,
            if status.archive { "yes" } else { "no" },
            if status.db { "yes" } else { "no" },
        );
    }
    Ok(())
}

/// Add a sticky suite from the archive mirror
pub fn cmd_archive_add(config: SyncConfig, suite: &str) -> Result<()> {
    config.warn_non_defaults();
    let conn = srcmirror::db::open(&config.db_path)?;
    let mut archive = SourceMirror::new(config.archive_dir());
    let updater = Updater::new(config)?;

    let report = Archiver::new(&updater).add_suite(&conn, &mut archive, suite)?;
    print_report("added", &report);
    check_failures("archive add", &report.failed)
}

/// Remove a sticky suite
pub fn cmd_archive_remove(config: SyncConfig, suite: &str) -> Result<()> {
    config.warn_non_defaults();
    let conn = srcmirror::db::open(&config.db_path)?;
    let updater = Updater::new(config)?;

    let report = Archiver::new(&updater).remove_suite(&conn, suite)?;
    print_report("removed", &report);
    check_failures("archive remove", &report.failed)
}

fn print_report(action: &str, report: &ArchiveReport) {
    if report.dry_run {
        println!("Dry run, nothing changed.");
    }
    println!("Sticky suite {} {}:", report.suite, action);
    if !report.added.is_empty() {
        println!("  Extracted: {}", report.added.len());
    }
    if !report.made_sticky.is_empty() {
        println!("  Already present, now sticky: {}", report.made_sticky.len());
    }
    if report.mappings > 0 {
        println!("  Suite mappings: {}", report.mappings);
    }
    for (label, pkgs) in [
        ("Removed", &report.removed),
        ("Kept for live suites", &report.unstickied),
        ("Kept for other sticky suites", &report.kept),
    ] {
        if !pkgs.is_empty() {
            println!("  {}: {}", label, pkgs.len());
        }
    }
}
