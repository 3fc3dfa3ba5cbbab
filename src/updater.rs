// src/updater.rs

//! Synchronizer between a source mirror and the local stores
//!
//! A run walks three stages:
//!
//! 1. `extract`: every mirror package missing from the database is
//!    extracted, recorded and handed to the `add-package` hooks
//! 2. `suites`: live suite mappings, suite records and aliases are rebuilt
//!    from the mirror indices, and `sources.txt` is regenerated
//! 3. `gc`: non-sticky versions gone from the mirror (and older than
//!    `expire_days`) go through `rm-package` hooks and are deleted
//!
//! The database is the completion marker: a package whose version row
//! exists was fully added on an earlier run. Each package is processed
//! inside its own savepoint so a failing hook leaves no rows behind for that
//! package; the failure is recorded in the [`UpdateReport`] and the run goes
//! on with the next package.

use crate::config::{Pass, Stage, SyncConfig};
use crate::db;
use crate::db::models::{
    Area, File, FileTable, Package, Suite, SuiteAlias, SuiteMapping, Version,
};
use crate::error::{Error, Result};
use crate::exclude::ExcludeSpecs;
use crate::hooks::{HookContext, HookEvent, HookRegistry};
use crate::mirror::{PackageId, SourceMirror, SourcePackage};
use crate::releases;
use crate::storage::{self, DpkgSource, Unpacker};
use chrono::{DateTime, Local};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Name of the package listing written to the cache directory
pub const SOURCES_LIST: &str = "sources.txt";

/// A package that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFailure {
    pub package: PackageId,
    pub error: String,
}

/// What a run would do, computed without touching either store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub to_add: Vec<PackageId>,
    pub to_remove: Vec<PackageId>,
}

/// Outcome of an update run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub added: Vec<PackageId>,
    pub removed: Vec<PackageId>,
    pub failed: Vec<PackageFailure>,
    /// Mirror packages skipped by exclusion rules
    pub excluded: usize,
    /// Suite mappings written by the `suites` stage
    pub suite_mappings: usize,
    /// Set instead of the counters above on dry runs
    pub plan: Option<UpdatePlan>,
}

impl UpdateReport {
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

/// One line of `sources.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceEntry {
    area: Area,
    dsc: PathBuf,
    pkgdir: PathBuf,
    suites: Vec<String>,
}

type SourcesList = BTreeMap<PackageId, SourceEntry>;

/// Drives the update stages for one configuration
pub struct Updater {
    config: SyncConfig,
    hooks: HookRegistry,
    unpacker: Box<dyn Unpacker>,
    excludes: ExcludeSpecs,
    /// Trees of versions deleted inside an open transaction, removed once it
    /// commits
    pending_removals: RefCell<Vec<(SourcePackage, PathBuf)>>,
}

impl Updater {
    /// Load the configured hooks and exclusion rules
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let hooks = HookRegistry::from_names(&config.hooks)?;
        let excludes = ExcludeSpecs::load_optional(config.exclude_file.as_deref())?;
        if !excludes.is_empty() {
            info!("Loaded {} exclusion rule(s)", excludes.len());
        }

        Ok(Self {
            config,
            hooks,
            unpacker: Box::new(DpkgSource::new()),
            excludes,
            pending_removals: RefCell::new(Vec::new()),
        })
    }

    pub fn with_unpacker(mut self, unpacker: impl Unpacker + 'static) -> Self {
        self.unpacker = Box::new(unpacker);
        self
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_excludes(mut self, excludes: ExcludeSpecs) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    fn pass(&self, pass: Pass) -> bool {
        self.config.passes.contains(pass)
    }

    fn stage(&self, stage: Stage) -> bool {
        self.config.stages.contains(&stage)
    }

    /// Run every configured stage against `mirror`
    pub fn update(&self, conn: &Connection, mirror: &mut SourceMirror) -> Result<UpdateReport> {
        if self.config.dry_run {
            let plan = self.plan(conn, mirror)?;
            for id in &plan.to_add {
                info!("would add {}", id);
            }
            for id in &plan.to_remove {
                info!("would remove {}", id);
            }
            for trigger in &self.config.force_triggers {
                info!("would force trigger {}", trigger);
            }
            return Ok(UpdateReport {
                plan: Some(plan),
                ..UpdateReport::default()
            });
        }

        if self.config.single_transaction {
            self.in_transaction(conn, |tx| self.run_stages(tx, mirror))
        } else {
            self.run_stages(conn, mirror)
        }
    }

    /// Run `f` in one transaction. Package trees deleted by `f` are removed
    /// from disk only after the commit; on rollback they stay in place.
    pub(crate) fn in_transaction<T, F>(&self, conn: &Connection, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = conn.unchecked_transaction()?;
        let result = f(&*tx).and_then(move |value| {
            tx.commit()?;
            Ok(value)
        });

        let pending = self.pending_removals.take();
        if result.is_ok() {
            for (pkg, pkgdir) in pending {
                if let Err(e) = storage::remove_package(&pkg, &pkgdir) {
                    error!("failed to remove tree of {}: {}", pkg, e);
                }
            }
        } else if !pending.is_empty() {
            info!("rolled back, keeping {} package tree(s)", pending.len());
        }
        result
    }

    fn run_stages(&self, conn: &Connection, mirror: &mut SourceMirror) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();
        let mut sources = SourcesList::new();

        if self.stage(Stage::Extract) {
            self.extract_new(conn, mirror, &mut sources, &mut report)?;
        }
        if self.stage(Stage::Suites) {
            self.update_suites(conn, mirror, &mut sources, &mut report)?;
            if self.stage(Stage::Extract) {
                self.write_sources_list(&sources)?;
            }
        }
        if self.stage(Stage::Gc) {
            self.garbage_collect(conn, mirror, &mut report)?;
        }

        info!(
            "Update finished: {} added, {} removed, {} failed",
            report.added.len(),
            report.removed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Additions and removals the configured stages would perform
    pub fn plan(&self, conn: &Connection, mirror: &mut SourceMirror) -> Result<UpdatePlan> {
        let mut plan = UpdatePlan::default();

        for pkg in mirror.ls()? {
            let pkg = pkg?;
            if self.stage(Stage::Extract)
                && !self.excludes.is_excluded_package(&pkg)
                && Version::lookup(conn, pkg.name(), pkg.version())?.is_none()
            {
                plan.to_add.push(pkg.id().clone());
            }
        }

        if self.stage(Stage::Gc) {
            let live = mirror.packages()?;
            for version in Version::list_non_sticky(conn)? {
                let pkg = SourcePackage::from_db_model(&version);
                if live.contains(pkg.id()) {
                    continue;
                }
                let expired = match pkg.extraction_dir(&self.config.sources_dir) {
                    Some(pkgdir) => self.is_expired(&pkgdir)?,
                    None => true,
                };
                if expired {
                    plan.to_remove.push(pkg.id().clone());
                }
            }
        }
        Ok(plan)
    }

    /// `extract` stage: add mirror packages the database does not know yet
    fn extract_new(
        &self,
        conn: &Connection,
        mirror: &mut SourceMirror,
        sources: &mut SourcesList,
        report: &mut UpdateReport,
    ) -> Result<()> {
        info!("add new packages...");

        for pkg in mirror.ls()? {
            let pkg = pkg?;
            if self.excludes.is_excluded_package(&pkg) {
                info!("skipping excluded package {}", pkg);
                report.excluded += 1;
                continue;
            }

            if Version::lookup(conn, pkg.name(), pkg.version())?.is_none() {
                match self.add_package(conn, &pkg, false) {
                    Ok(true) => report.added.push(pkg.id().clone()),
                    Ok(false) => {}
                    Err(e) => {
                        error!("failed to add {}: {}", pkg, e);
                        report.record_failure(pkg.id().clone(), &e);
                    }
                }
            }

            if !self.config.force_triggers.is_empty() {
                self.force_triggers(conn, HookEvent::AddPackage, &pkg, report);
            }

            match self.source_entry(&pkg) {
                Ok(entry) => {
                    sources.insert(pkg.id().clone(), entry);
                }
                Err(e) => warn!("no {} entry for {}: {}", SOURCES_LIST, pkg, e),
            }
        }
        Ok(())
    }

    /// Extract `pkg`, record it and notify `add-package` hooks.
    ///
    /// Returns `false` if the package was skipped because its extraction
    /// directory cannot be determined. Database changes, including those of
    /// hooks, are rolled back if any step fails; the extracted tree and hook
    /// sidecars already written are left for the next run to reuse or redo.
    pub fn add_package(&self, conn: &Connection, pkg: &SourcePackage, sticky: bool) -> Result<bool> {
        info!("add {}...", pkg);
        let (Some(area), Some(pkgdir)) = (
            pkg.archive_area(),
            pkg.extraction_dir(&self.config.sources_dir),
        ) else {
            warn!("package {} has no extraction dir, skipping", pkg);
            return Ok(false);
        };

        if self.pass(Pass::Fs) {
            storage::extract_package(self.unpacker.as_ref(), pkg, &pkgdir)?;
        }

        db::with_savepoint(conn, "add_package", |conn| {
            let mut files: Vec<PathBuf> = if pkgdir.is_dir() {
                storage::walk_pkg_files(&pkgdir, None)?
                    .into_iter()
                    .map(|(relpath, _)| relpath)
                    .collect()
            } else {
                Vec::new()
            };

            let excluded: BTreeSet<PathBuf> =
                self.excludes.excluded_files(pkg, &files)?.into_iter().collect();
            if !excluded.is_empty() {
                info!("excluding {} file(s) from {}", excluded.len(), pkg);
                for relpath in &excluded {
                    debug!("excluding file {}", relpath.display());
                    if self.pass(Pass::Fs) {
                        storage::rm_file(&pkgdir, relpath)?;
                    }
                }
                files.retain(|f| !excluded.contains(f));
            }

            let file_table = if self.pass(Pass::Db) {
                record_package(conn, pkg, area, sticky, &files)?
            } else {
                FileTable::new()
            };

            if self.pass(Pass::Hooks) {
                let ctx = HookContext {
                    conn,
                    pkg,
                    pkgdir: &pkgdir,
                    file_table: &file_table,
                    passes: &self.config.passes,
                };
                self.hooks.notify(HookEvent::AddPackage, &ctx)?;
            }
            Ok(())
        })?;

        Ok(true)
    }

    /// Notify `rm-package` hooks, delete the version and remove its tree.
    ///
    /// Inside an open transaction the tree is only queued for removal; see
    /// [`Updater::in_transaction`].
    pub fn rm_package(&self, conn: &Connection, version: &Version) -> Result<()> {
        let pkg = SourcePackage::from_db_model(version);
        info!("remove {}...", pkg);
        let version_id = version
            .id
            .ok_or_else(|| Error::NotFoundError(format!("{} has no row id", pkg)))?;
        let pkgdir = pkg
            .extraction_dir(&self.config.sources_dir)
            .ok_or_else(|| Error::NotFoundError(format!("no extraction dir for {}", pkg)))?;

        db::with_savepoint(conn, "rm_package", |conn| {
            if self.pass(Pass::Hooks) {
                let file_table = File::table_for_version(conn, version_id)?;
                let ctx = HookContext {
                    conn,
                    pkg: &pkg,
                    pkgdir: &pkgdir,
                    file_table: &file_table,
                    passes: &self.config.passes,
                };
                self.hooks.notify(HookEvent::RmPackage, &ctx)?;
            }
            if self.pass(Pass::Db) {
                Version::delete(conn, version_id)?;
                Package::delete_if_orphaned(conn, version.package_id)?;
            }
            Ok(())
        })?;

        if self.pass(Pass::Fs) {
            if conn.is_autocommit() {
                storage::remove_package(&pkg, &pkgdir)?;
            } else {
                debug!("removing {} once the transaction commits", pkg);
                self.pending_removals.borrow_mut().push((pkg, pkgdir));
            }
        }
        Ok(())
    }

    /// `gc` stage: remove non-sticky versions the mirror no longer lists
    fn garbage_collect(
        &self,
        conn: &Connection,
        mirror: &mut SourceMirror,
        report: &mut UpdateReport,
    ) -> Result<()> {
        info!("garbage collection...");
        let live = mirror.packages()?;

        for version in Version::list_non_sticky(conn)? {
            let pkg = SourcePackage::from_db_model(&version);
            let mut present = true;

            if !live.contains(pkg.id()) {
                let expired = match pkg.extraction_dir(&self.config.sources_dir) {
                    Some(pkgdir) => self.is_expired(&pkgdir)?,
                    None => true,
                };
                if expired {
                    match self.rm_package(conn, &version) {
                        Ok(()) => {
                            report.removed.push(pkg.id().clone());
                            present = !self.pass(Pass::Db);
                        }
                        Err(e) => {
                            error!("failed to remove {}: {}", pkg, e);
                            report.record_failure(pkg.id().clone(), &e);
                        }
                    }
                } else {
                    debug!("not removing {} as it is too young", pkg);
                }
            }

            if present && !self.config.force_triggers.is_empty() {
                self.force_triggers(conn, HookEvent::RmPackage, &pkg, report);
            }
        }
        Ok(())
    }

    /// Whether the extraction at `pkgdir` is old enough to be collected.
    /// A missing directory always is.
    fn is_expired(&self, pkgdir: &Path) -> Result<bool> {
        let modified = match fs::metadata(pkgdir) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        let age = Local::now().signed_duration_since(DateTime::<Local>::from(modified));
        Ok(age.num_days() >= i64::from(self.config.expire_days))
    }

    /// `suites` stage: rebuild mappings, suite records and aliases of every
    /// live suite from the mirror indices
    fn update_suites(
        &self,
        conn: &Connection,
        mirror: &mut SourceMirror,
        sources: &mut SourcesList,
        report: &mut UpdateReport,
    ) -> Result<()> {
        info!("update suites mappings...");
        let use_db = self.pass(Pass::Db);

        let aliases = mirror.ls_suites_with_aliases()?;
        if use_db {
            SuiteAlias::delete_all(conn)?;
        }

        let suites = mirror.suites()?;
        for (suite, ids) in suites {
            if Suite::find_by_name(conn, suite)?.is_some_and(|s| s.sticky) {
                warn!("suite {} is archived, not touching its mappings", suite);
                continue;
            }

            if use_db {
                SuiteMapping::delete_suite(conn, suite)?;
            }
            for id in ids {
                let Some(version) = Version::lookup(conn, &id.name, &id.version)? else {
                    warn!("package {} not found in suite {}, skipping", id, suite);
                    continue;
                };
                debug!("add suite mapping: {} -> {}", id, suite);

                if use_db
                    && let Some(version_id) = version.id
                    && SuiteMapping::new(version_id, suite.clone()).insert_if_missing(conn)?
                {
                    report.suite_mappings += 1;
                }
                if let Some(entry) = sources.get_mut(id) {
                    if !entry.suites.contains(suite) {
                        entry.suites.push(suite.clone());
                    }
                } else if self.stage(Stage::Extract) {
                    warn!("cannot find {} during suite update", id);
                }
            }

            if use_db {
                Suite::delete_by_name(conn, suite)?;
                let suite_aliases = aliases.get(suite).map(Vec::as_slice).unwrap_or(&[]);
                register_suite(conn, suite, false, suite_aliases)?;
            }
        }

        // live suites that vanished from the mirror
        if use_db {
            for suite in Suite::list(conn, false)? {
                if !suite.sticky && !suites.contains_key(&suite.name) {
                    info!("suite {} is gone from the mirror, dropping it", suite.name);
                    SuiteMapping::delete_suite(conn, &suite.name)?;
                    Suite::delete_by_name(conn, &suite.name)?;
                }
            }
        }
        Ok(())
    }

    /// Re-run the forced triggers of `event` on `pkg`. Failures are
    /// recorded and never abort the run.
    fn force_triggers(
        &self,
        conn: &Connection,
        event: HookEvent,
        pkg: &SourcePackage,
        report: &mut UpdateReport,
    ) {
        let result = self.run_forced(conn, event, pkg);
        if let Err(e) = result {
            error!("trigger failure on {}: {}", pkg, e);
            report.record_failure(pkg.id().clone(), &e);
        }
    }

    fn run_forced(&self, conn: &Connection, event: HookEvent, pkg: &SourcePackage) -> Result<()> {
        let Some(pkgdir) = pkg.extraction_dir(&self.config.sources_dir) else {
            return Ok(());
        };

        db::with_savepoint(conn, "force_trigger", |conn| {
            let file_table = match Version::lookup(conn, pkg.name(), pkg.version())? {
                Some(Version { id: Some(id), .. }) => File::table_for_version(conn, id)?,
                _ => FileTable::new(),
            };
            let ctx = HookContext {
                conn,
                pkg,
                pkgdir: &pkgdir,
                file_table: &file_table,
                passes: &self.config.passes,
            };
            self.hooks
                .notify_forced(event, &ctx, &self.config.force_triggers)
        })
    }

    fn source_entry(&self, pkg: &SourcePackage) -> Result<SourceEntry> {
        let area = pkg
            .archive_area()
            .ok_or_else(|| Error::ParseError(format!("no archive area for {}", pkg)))?;
        let dsc = pkg.dsc_path()?;
        let dsc = pkg
            .mirror_root()
            .and_then(|root| dsc.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or(dsc);
        let pkgdir = pkg
            .extraction_dir(Path::new(""))
            .ok_or_else(|| Error::ParseError(format!("no extraction dir for {}", pkg)))?;

        Ok(SourceEntry {
            area,
            dsc,
            pkgdir,
            suites: Vec::new(),
        })
    }

    /// Atomically replace `cache_dir/sources.txt`
    fn write_sources_list(&self, sources: &SourcesList) -> Result<()> {
        fs::create_dir_all(&self.config.cache_dir)?;
        let path = self.config.cache_dir.join(SOURCES_LIST);
        storage::write_atomically(&path, |out| write_sources(out, sources))?;
        debug!("wrote {} entries to {}", sources.len(), path.display());
        Ok(())
    }
}

/// Insert the package, version and file rows for `pkg`
fn record_package(
    conn: &Connection,
    pkg: &SourcePackage,
    area: Area,
    sticky: bool,
    files: &[PathBuf],
) -> Result<FileTable> {
    let package_id = Package::find_or_create(conn, pkg.name())?;

    let mut version = Version::new(
        package_id,
        pkg.name().to_string(),
        pkg.version().to_string(),
        area,
    );
    if let Some((vcs_type, url)) = pkg.vcs() {
        version.vcs_type = Some(vcs_type);
        version.vcs_url = Some(url.to_string());
    }
    version.vcs_browser = pkg.vcs_browser().map(String::from);
    version.sticky = sticky;
    let version_id = version.insert(conn)?;

    File::insert_all(conn, version_id, files)
}

/// Create a suite record with release metadata and aliases
pub fn register_suite(conn: &Connection, name: &str, sticky: bool, aliases: &[String]) -> Result<i64> {
    let mut suite = Suite::new(name.to_string(), sticky);
    if let Some(release) = releases::lookup(name) {
        suite.version = Some(release.version.to_string());
        suite.release_date = release.release_date();
    }
    let suite_id = suite.insert(conn)?;

    for alias in aliases {
        SuiteAlias::new(alias.clone(), suite_id).insert(conn)?;
    }
    Ok(suite_id)
}

fn write_sources<W: Write>(out: &mut W, sources: &SourcesList) -> Result<()> {
    for (id, entry) in sources {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            id.name,
            id.version,
            entry.area,
            entry.dsc.display(),
            entry.pkgdir.display(),
            entry.suites.join(",")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn touch_days_ago(path: &Path, days: u64) {
        let when = SystemTime::now() - Duration::from_secs(days * 24 * 3600 + 60);
        fs::File::open(path).unwrap().set_modified(when).unwrap();
    }

    fn updater(expire_days: u32) -> Updater {
        let config = SyncConfig {
            expire_days,
            hooks: Vec::new(),
            ..SyncConfig::default()
        };
        Updater::new(config).unwrap()
    }

    #[test]
    fn test_expiry() {
        let dir = TempDir::new().unwrap();
        let pkgdir = dir.path().join("1.0");
        fs::create_dir(&pkgdir).unwrap();

        assert!(updater(0).is_expired(&pkgdir).unwrap());
        assert!(!updater(3).is_expired(&pkgdir).unwrap());

        touch_days_ago(&pkgdir, 5);
        assert!(updater(3).is_expired(&pkgdir).unwrap());
        assert!(updater(7).is_expired(&dir.path().join("missing")).unwrap());
    }

    #[test]
    fn test_sources_list_format() {
        let mut sources = SourcesList::new();
        sources.insert(
            PackageId::new("hello", "2.8-2"),
            SourceEntry {
                area: Area::Main,
                dsc: PathBuf::from("pool/main/h/hello/hello_2.8-2.dsc"),
                pkgdir: PathBuf::from("main/h/hello/2.8-2"),
                suites: vec!["jessie".into(), "sid".into()],
            },
        );

        let mut out = Vec::new();
        write_sources(&mut out, &sources).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "hello\t2.8-2\tmain\tpool/main/h/hello/hello_2.8-2.dsc\tmain/h/hello/2.8-2\tjessie,sid\n"
        );
    }

    #[test]
    fn test_tree_removal_waits_for_commit() {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig {
            sources_dir: dir.path().join("sources"),
            hooks: Vec::new(),
            ..SyncConfig::default()
        };
        let updater = Updater::new(config).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        db::schema::migrate(&conn).unwrap();
        let package_id = Package::find_or_create(&conn, "hello").unwrap();
        Version::new(package_id, "hello".into(), "1.0".into(), Area::Main)
            .insert(&conn)
            .unwrap();
        let version = Version::lookup(&conn, "hello", "1.0").unwrap().unwrap();

        let pkgdir = dir.path().join("sources/main/h/hello/1.0");
        fs::create_dir_all(&pkgdir).unwrap();
        fs::write(pkgdir.join("hello.c"), "int main;\n").unwrap();

        // rolled back: the row comes back and the tree was never touched
        let result: Result<()> = updater.in_transaction(&conn, |tx| {
            updater.rm_package(tx, &version)?;
            assert!(pkgdir.join("hello.c").is_file());
            Err(Error::Config("abort".into()))
        });
        assert!(result.is_err());
        assert!(Version::lookup(&conn, "hello", "1.0").unwrap().is_some());
        assert!(pkgdir.join("hello.c").is_file());

        updater
            .in_transaction(&conn, |tx| updater.rm_package(tx, &version))
            .unwrap();
        assert!(Version::lookup(&conn, "hello", "1.0").unwrap().is_none());
        assert!(!pkgdir.exists());

        // outside a transaction the tree goes right away
        let package_id = Package::find_or_create(&conn, "hello").unwrap();
        Version::new(package_id, "hello".into(), "1.1".into(), Area::Main)
            .insert(&conn)
            .unwrap();
        let version = Version::lookup(&conn, "hello", "1.1").unwrap().unwrap();
        let pkgdir = dir.path().join("sources/main/h/hello/1.1");
        fs::create_dir_all(&pkgdir).unwrap();
        updater.rm_package(&conn, &version).unwrap();
        assert!(!pkgdir.exists());
    }

    #[test]
    fn test_register_suite_with_release_info() {
        let conn = Connection::open_in_memory().unwrap();
        db::schema::migrate(&conn).unwrap();

        register_suite(&conn, "woody", true, &[]).unwrap();
        register_suite(&conn, "sid", false, &["unstable".to_string()]).unwrap();

        let woody = Suite::find_by_name(&conn, "woody").unwrap().unwrap();
        assert_eq!(woody.version.as_deref(), Some("3.0"));
        assert!(woody.sticky);

        let sid = Suite::find_by_name(&conn, "sid").unwrap().unwrap();
        assert_eq!(sid.version, None);
        assert_eq!(
            SuiteAlias::find_by_suite(&conn, sid.id.unwrap()).unwrap(),
            vec!["unstable"]
        );
    }
}
