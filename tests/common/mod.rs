// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! A [`TestMirror`] is a throwaway Debian mirror: `dists/<suite>/main/source/Sources.gz`
//! indices plus a pool where every package has a `.dsc` and, next to it, the
//! tree [`TreeCopy`] "unpacks" by copying.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use rusqlite::Connection;
use srcmirror::db;
use srcmirror::mirror::{SourcePackage, pkg_prefix};
use srcmirror::{Error, Result, SourceMirror, SyncConfig, Unpacker, Updater};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Unpacker that copies the `{name}-{version}` tree sitting next to the
/// package's `.dsc`. Fails when there is no such tree.
pub struct TreeCopy;

impl Unpacker for TreeCopy {
    fn name(&self) -> &str {
        "tree-copy"
    }

    fn unpack(&self, pkg: &SourcePackage, destdir: &Path, mut log: File) -> Result<()> {
        let dsc = pkg.dsc_path()?;
        let tree = dsc.with_file_name(format!("{}-{}", pkg.name(), pkg.version()));
        if !tree.is_dir() {
            return Err(Error::command("tree-copy", format!("no source tree for {}", pkg)));
        }

        for entry in WalkDir::new(&tree) {
            let entry = entry?;
            let relpath = entry
                .path()
                .strip_prefix(&tree)
                .map_err(|e| Error::IoError(e.to_string()))?;
            let target = destdir.join(relpath);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
        writeln!(log, "copied {}", tree.display())?;
        Ok(())
    }
}

/// A mirror under construction
pub struct TestMirror {
    pub root: PathBuf,
    suites: BTreeMap<String, BTreeSet<(String, String)>>,
}

impl TestMirror {
    pub fn new(root: PathBuf) -> Self {
        fs::create_dir_all(root.join("dists")).unwrap();
        Self {
            root,
            suites: BTreeMap::new(),
        }
    }

    fn pool_dir(&self, name: &str) -> PathBuf {
        self.root
            .join("pool/main")
            .join(pkg_prefix(name))
            .join(name)
    }

    /// Put a package in the pool with `files` as its source tree
    pub fn pool_package(&self, name: &str, version: &str, files: &[(&str, &str)]) {
        self.pool_dsc(name, version);
        let tree = self.source_tree(name, version);
        for (path, content) in files {
            let path = tree.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    /// Put only the `.dsc` of a package in the pool, so unpacking it fails
    pub fn pool_dsc(&self, name: &str, version: &str) {
        let dir = self.pool_dir(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{}_{}.dsc", name, version)),
            format!("Source: {}\nVersion: {}\n", name, version),
        )
        .unwrap();
    }

    /// Directory `TreeCopy` copies from
    pub fn source_tree(&self, name: &str, version: &str) -> PathBuf {
        self.pool_dir(name).join(format!("{}-{}", name, version))
    }

    /// List a pooled package in a suite's index
    pub fn list(&mut self, suite: &str, name: &str, version: &str) {
        self.suites
            .entry(suite.to_string())
            .or_default()
            .insert((name.to_string(), version.to_string()));
    }

    pub fn unlist(&mut self, suite: &str, name: &str, version: &str) {
        if let Some(packages) = self.suites.get_mut(suite) {
            packages.remove(&(name.to_string(), version.to_string()));
        }
    }

    /// Pool a package and list it in `suite`
    pub fn add(&mut self, suite: &str, name: &str, version: &str, files: &[(&str, &str)]) {
        self.pool_package(name, version, files);
        self.list(suite, name, version);
    }

    /// Write `Sources.gz` for every suite, replacing the previous indices
    pub fn publish(&self) {
        let dists = self.root.join("dists");
        fs::remove_dir_all(&dists).unwrap();
        for (suite, packages) in self.suites.iter().filter(|(_, p)| !p.is_empty()) {
            let dir = dists.join(suite).join("main/source");
            fs::create_dir_all(&dir).unwrap();

            let mut gz = GzEncoder::new(File::create(dir.join("Sources.gz")).unwrap(), Compression::default());
            for (name, version) in packages {
                write!(
                    gz,
                    "Package: {name}\n\
                     Version: {version}\n\
                     Section: devel\n\
                     Directory: pool/main/{prefix}/{name}\n\
                     Files:\n \
                     d41d8cd98f00b204e9800998ecf8427e 42 {name}_{version}.dsc\n\n",
                    prefix = pkg_prefix(name),
                )
                .unwrap();
            }
            gz.finish().unwrap();
        }
    }

    pub fn open(&self) -> SourceMirror {
        SourceMirror::new(&self.root)
    }
}

/// Database, store directories and mirrors of one test
pub struct Fixture {
    _temp: TempDir,
    pub config: SyncConfig,
    pub mirror: TestMirror,
    pub archive: TestMirror,
}

impl Fixture {
    /// Fresh fixture with only the checksums hook loaded
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();

        let config = SyncConfig {
            mirror_dir: root.join("mirror"),
            archive_dir: Some(root.join("archive")),
            sources_dir: root.join("sources"),
            cache_dir: root.join("cache"),
            db_path: root.join("test.db"),
            hooks: vec!["checksums".to_string()],
            ..SyncConfig::default()
        };
        db::init(&config.db_path).unwrap();

        Self {
            mirror: TestMirror::new(config.mirror_dir.clone()),
            archive: TestMirror::new(root.join("archive")),
            config,
            _temp: temp,
        }
    }

    pub fn conn(&self) -> Connection {
        db::open(&self.config.db_path).unwrap()
    }

    pub fn updater(&self) -> Updater {
        self.updater_with(self.config.clone())
    }

    pub fn updater_with(&self, config: SyncConfig) -> Updater {
        Updater::new(config).unwrap().with_unpacker(TreeCopy)
    }

    /// Extraction directory of a `main` package
    pub fn pkgdir(&self, name: &str, version: &str) -> PathBuf {
        self.config
            .sources_dir
            .join("main")
            .join(pkg_prefix(name))
            .join(name)
            .join(version)
    }

    /// Executable `/bin/sh` script standing in for an external tool
    pub fn script(&self, name: &str, body: &str) -> String {
        let bin = self._temp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// `pkgdir` plus a sidecar extension
    pub fn sidecar(&self, name: &str, version: &str, ext: &str) -> PathBuf {
        srcmirror::storage::sidecar_path(&self.pkgdir(name, version), ext)
    }
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}
