// src/archiver.rs

//! Sticky suites: releases kept in the store after they leave the live
//! mirror
//!
//! Versions of a sticky suite carry the `sticky` flag, which shields them
//! from garbage collection. Removing a sticky suite reference-counts every
//! version it maps:
//!
//! | other suites mapping the version | outcome                     |
//! |----------------------------------|-----------------------------|
//! | none                             | version removed             |
//! | live suites only                 | `sticky` cleared, kept      |
//! | at least one sticky suite        | left untouched              |

use crate::config::{Pass, Stage};
use crate::db::models::{Suite, SuiteMapping, Version};
use crate::error::{Error, Result};
use crate::mirror::{PackageId, SourceMirror, SourcePackage};
use crate::releases;
use crate::updater::{PackageFailure, Updater, register_suite};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

/// Where a suite is available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteStatus {
    /// Listed by the archive mirror
    pub archive: bool,
    /// Registered as a sticky suite in the database
    pub db: bool,
}

/// Outcome of adding or removing a sticky suite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub suite: String,
    /// Versions extracted and recorded for the suite
    pub added: Vec<PackageId>,
    /// Existing versions that gained the sticky flag
    pub made_sticky: Vec<PackageId>,
    pub mappings: usize,
    pub removed: Vec<PackageId>,
    /// Versions still needed by live suites only
    pub unstickied: Vec<PackageId>,
    /// Versions still needed by another sticky suite
    pub kept: Vec<PackageId>,
    pub failed: Vec<PackageFailure>,
    pub dry_run: bool,
}

impl ArchiveReport {
    fn new(suite: &str, dry_run: bool) -> Self {
        Self {
            suite: suite.to_string(),
            dry_run,
            ..Self::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    fn record_failure(&mut self, package: PackageId, e: &Error) {
        self.failed.push(PackageFailure {
            package,
            error: e.to_string(),
        });
    }
}

/// What removing a sticky suite does to one of its versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposal {
    Remove,
    ClearSticky,
    Keep,
}

/// Sticky suite management on top of an [`Updater`]
pub struct Archiver<'a> {
    updater: &'a Updater,
}

impl<'a> Archiver<'a> {
    pub fn new(updater: &'a Updater) -> Self {
        Self { updater }
    }

    fn dry_run(&self) -> bool {
        self.updater.config().dry_run
    }

    fn stage(&self, stage: Stage) -> bool {
        self.updater.config().stages.contains(&stage)
    }

    /// Every suite known to the archive mirror or registered as sticky
    pub fn list_suites(
        &self,
        conn: &Connection,
        archive: &SourceMirror,
    ) -> Result<BTreeMap<String, SuiteStatus>> {
        let mut suites: BTreeMap<String, SuiteStatus> = BTreeMap::new();
        for suite in archive.ls_suites()? {
            suites.entry(suite).or_default().archive = true;
        }
        for suite in Suite::list(conn, true)? {
            suites.entry(suite.name).or_default().db = true;
        }
        Ok(suites)
    }

    /// Make `suite` of the archive mirror sticky, adding whatever packages
    /// of it are missing
    pub fn add_suite(
        &self,
        conn: &Connection,
        archive: &mut SourceMirror,
        suite: &str,
    ) -> Result<ArchiveReport> {
        info!("add sticky suite {} to the archive...", suite);

        if !archive.ls_suites()?.iter().any(|s| s == suite) {
            return Err(Error::NotFoundError(format!(
                "suite {} is not in the archive at {}",
                suite,
                archive.root().display()
            )));
        }
        if let Some(release) = releases::lookup(suite)
            && !release.archived
        {
            return Err(Error::Config(format!(
                "{} is not an archived release, it cannot be made sticky",
                suite
            )));
        }

        let mut report = ArchiveReport::new(suite, self.dry_run());
        if self.updater.config().single_transaction && !self.dry_run() {
            self.updater.in_transaction(conn, |tx| {
                self.add_suite_packages(tx, archive, suite, &mut report)
            })?;
        } else {
            self.add_suite_packages(conn, archive, suite, &mut report)?;
        }

        info!("sticky suite {} added to the archive.", suite);
        Ok(report)
    }

    fn add_suite_packages(
        &self,
        conn: &Connection,
        archive: &mut SourceMirror,
        suite: &str,
        report: &mut ArchiveReport,
    ) -> Result<()> {
        let dry_run = self.dry_run();
        let use_db = self.updater.config().passes.contains(Pass::Db);

        match Suite::find_by_name(conn, suite)? {
            Some(existing) if existing.sticky => {
                warn!(
                    "sticky suite {} already exists, looking for new packages",
                    suite
                );
            }
            Some(_) => {
                return Err(Error::Config(format!(
                    "suite {} is a live suite of the mirror",
                    suite
                )));
            }
            None if self.stage(Stage::Extract) && use_db && !dry_run => {
                let suite_id = register_suite(conn, suite, true, &[])?;
                debug!("registered sticky suite {} as {}", suite, suite_id);
            }
            None => {}
        }

        let mut members = Vec::new();
        for pkg in archive.ls_suite(suite)? {
            let pkg = pkg?;
            members.push(pkg.id().clone());
            if !self.stage(Stage::Extract) {
                continue;
            }

            match Version::lookup(conn, pkg.name(), pkg.version())? {
                Some(version) => {
                    // avoid garbage collection once a live suite drops it
                    if !version.sticky {
                        debug!("setting sticky bit on {}", pkg);
                        if !dry_run
                            && let Some(id) = version.id
                        {
                            Version::set_sticky(conn, id, true)?;
                        }
                        report.made_sticky.push(pkg.id().clone());
                    }
                }
                None if dry_run => {
                    info!("would add {}", pkg);
                    report.added.push(pkg.id().clone());
                }
                None => match self.updater.add_package(conn, &pkg, true) {
                    Ok(true) => report.added.push(pkg.id().clone()),
                    Ok(false) => {}
                    Err(e) => {
                        error!("failed to add {}: {}", pkg, e);
                        report.record_failure(pkg.id().clone(), &e);
                    }
                },
            }
        }

        if self.stage(Stage::Suites) && use_db && !dry_run {
            for id in &members {
                let Some(version) = Version::lookup(conn, &id.name, &id.version)? else {
                    warn!(
                        "package {} not found in sticky suite {}, skipping",
                        id, suite
                    );
                    continue;
                };
                if let Some(version_id) = version.id
                    && SuiteMapping::new(version_id, suite.to_string()).insert_if_missing(conn)?
                {
                    report.mappings += 1;
                }
            }
        }
        Ok(())
    }

    /// Drop sticky suite `suite`, removing the versions nothing else needs
    pub fn remove_suite(&self, conn: &Connection, suite: &str) -> Result<ArchiveReport> {
        info!("remove sticky suite {} from the archive...", suite);

        if !Suite::find_by_name(conn, suite)?.is_some_and(|s| s.sticky) {
            return Err(Error::NotFoundError(format!(
                "sticky suite {} does not exist in the database",
                suite
            )));
        }

        let mut report = ArchiveReport::new(suite, self.dry_run());
        if !self.stage(Stage::Gc) {
            warn!("gc stage disabled, not removing suite {}", suite);
            return Ok(report);
        }

        let plan = plan_removal(conn, suite)?;
        for (version, disposal) in &plan {
            let id = PackageId::new(version.name.as_str(), version.vnumber.as_str());
            match disposal {
                Disposal::Remove => report.removed.push(id),
                Disposal::ClearSticky => report.unstickied.push(id),
                Disposal::Keep => report.kept.push(id),
            }
        }

        if self.dry_run() {
            for id in &report.removed {
                info!("would remove {}", id);
            }
            for id in &report.unstickied {
                info!("would clear sticky bit on {}", id);
            }
            return Ok(report);
        }

        if self.updater.config().single_transaction {
            self.updater
                .in_transaction(conn, |tx| self.apply_removal(tx, suite, &plan, &mut report))?;
        } else {
            self.apply_removal(conn, suite, &plan, &mut report)?;
        }

        info!("sticky suite {} removed from the archive.", suite);
        Ok(report)
    }

    fn apply_removal(
        &self,
        conn: &Connection,
        suite: &str,
        plan: &[(Version, Disposal)],
        report: &mut ArchiveReport,
    ) -> Result<()> {
        let use_db = self.updater.config().passes.contains(Pass::Db);

        for (version, disposal) in plan {
            let Some(version_id) = version.id else {
                continue;
            };
            let pkg = SourcePackage::from_db_model(version);

            match disposal {
                Disposal::Remove => {
                    if let Err(e) = self.updater.rm_package(conn, version) {
                        error!("failed to remove {}: {}", pkg, e);
                        report.removed.retain(|id| id != pkg.id());
                        report.record_failure(pkg.id().clone(), &e);
                        // keep the mapping so a re-run finds it again
                        continue;
                    }
                }
                Disposal::ClearSticky if use_db => {
                    debug!("clearing sticky bit on {}", pkg);
                    Version::set_sticky(conn, version_id, false)?;
                }
                Disposal::ClearSticky | Disposal::Keep => {}
            }

            if use_db {
                SuiteMapping::delete(conn, version_id, suite)?;
            }
        }

        if use_db && !report.has_failures() {
            // also mappings of non-sticky versions, e.g. from a suites-only add
            let leftover = SuiteMapping::delete_suite(conn, suite)?;
            if leftover > 0 {
                debug!("dropped {} remaining mapping(s) of {}", leftover, suite);
            }
            Suite::delete_by_name(conn, suite)?;
        }
        Ok(())
    }
}

/// Decide the fate of every sticky version of `suite` before anything is
/// changed
fn plan_removal(conn: &Connection, suite: &str) -> Result<Vec<(Version, Disposal)>> {
    let sticky_suites: BTreeSet<String> = Suite::list(conn, true)?
        .into_iter()
        .map(|s| s.name)
        .collect();

    let mut plan = Vec::new();
    for version in Version::list_sticky_in_suite(conn, suite)? {
        let Some(version_id) = version.id else {
            continue;
        };
        let others = SuiteMapping::other_suites(conn, version_id, suite)?;
        let disposal = if others.is_empty() {
            Disposal::Remove
        } else if others.iter().any(|s| sticky_suites.contains(s)) {
            Disposal::Keep
        } else {
            Disposal::ClearSticky
        };
        plan.push((version, disposal));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Area, Package};
    use crate::db::schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    fn add_version(conn: &Connection, name: &str, sticky: bool, suites: &[&str]) -> i64 {
        let package_id = Package::find_or_create(conn, name).unwrap();
        let mut version = Version::new(package_id, name.into(), "1.0".into(), Area::Main);
        version.sticky = sticky;
        let id = version.insert(conn).unwrap();
        for suite in suites {
            SuiteMapping::new(id, suite.to_string())
                .insert_if_missing(conn)
                .unwrap();
        }
        id
    }

    fn disposal_of(plan: &[(Version, Disposal)], name: &str) -> Disposal {
        plan.iter().find(|(v, _)| v.name == name).unwrap().1
    }

    #[test]
    fn test_plan_reference_counting() {
        let conn = setup();
        register_suite(&conn, "etch", true, &[]).unwrap();
        register_suite(&conn, "lenny", true, &[]).unwrap();
        register_suite(&conn, "sid", false, &[]).unwrap();

        add_version(&conn, "only-etch", true, &["etch"]);
        add_version(&conn, "etch-and-sid", true, &["etch", "sid"]);
        add_version(&conn, "etch-and-lenny", true, &["etch", "lenny"]);
        add_version(&conn, "lenny-only", true, &["lenny"]);
        add_version(&conn, "live", false, &["etch", "sid"]);

        let plan = plan_removal(&conn, "etch").unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(disposal_of(&plan, "only-etch"), Disposal::Remove);
        assert_eq!(disposal_of(&plan, "etch-and-sid"), Disposal::ClearSticky);
        assert_eq!(disposal_of(&plan, "etch-and-lenny"), Disposal::Keep);
    }
}
