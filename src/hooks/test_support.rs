// src/hooks/test_support.rs

//! One recorded package with an extracted tree, for exercising hooks that
//! run external tools. Tools are replaced by shell scripts.

use super::HookContext;
use crate::config::Passes;
use crate::db::models::{Area, File, FileTable, Package, Version};
use crate::db::schema;
use crate::mirror::SourcePackage;
use crate::mirror::deb822::parse_str;
use rusqlite::Connection;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

pub(crate) struct HookFixture {
    pub dir: TempDir,
    pub conn: Connection,
    pub pkg: SourcePackage,
    pub pkgdir: PathBuf,
    pub file_table: FileTable,
    pub version_id: i64,
    pub passes: Passes,
}

impl HookFixture {
    /// `hello/1.0` extracted with `files` and recorded in a fresh database
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let pkgdir = dir.path().join("sources/main/h/hello/1.0");
        for (path, content) in files {
            let path = pkgdir.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        schema::migrate(&conn).unwrap();

        let package_id = Package::find_or_create(&conn, "hello").unwrap();
        let version_id = Version::new(package_id, "hello".into(), "1.0".into(), Area::Main)
            .insert(&conn)
            .unwrap();
        let file_table =
            File::insert_all(&conn, version_id, files.iter().map(|(path, _)| *path)).unwrap();

        let paragraph = parse_str("Package: hello\nVersion: 1.0\nDirectory: pool/main/h/hello\n")
            .unwrap()
            .remove(0);
        let pkg = SourcePackage::from_paragraph(paragraph, &dir.path().join("mirror")).unwrap();

        Self {
            dir,
            conn,
            pkg,
            pkgdir,
            file_table,
            version_id,
            passes: Passes::all(),
        }
    }

    pub fn ctx(&self) -> HookContext<'_> {
        HookContext {
            conn: &self.conn,
            pkg: &self.pkg,
            pkgdir: &self.pkgdir,
            file_table: &self.file_table,
            passes: &self.passes,
        }
    }

    pub fn sidecar(&self, ext: &str) -> PathBuf {
        crate::storage::sidecar_path(&self.pkgdir, ext)
    }

    /// Write an executable `/bin/sh` script outside the package tree and
    /// return its path
    pub fn script(&self, name: &str, body: &str) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Path of a program that does not exist
    pub fn missing_program(&self) -> String {
        self.dir.path().join("no-such-tool").to_string_lossy().into_owned()
    }
}
