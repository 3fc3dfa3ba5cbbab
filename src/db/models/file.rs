// src/db/models/file.rs

//! File model - paths inside an extracted package version

use crate::error::Result;
use rusqlite::{Connection, Row, params};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Relative path -> `files.id` for one version.
///
/// Built once per package by the updater and shared read-only with every
/// hook.
pub type FileTable = BTreeMap<PathBuf, i64>;

/// A file inside an extracted package tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub id: Option<i64>,
    pub version_id: i64,
    pub path: PathBuf,
}

impl File {
    pub fn new(version_id: i64, path: PathBuf) -> Self {
        Self {
            id: None,
            version_id,
            path,
        }
    }

    /// Insert this file into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (version_id, path) VALUES (?1, ?2)",
            params![&self.version_id, self.path.as_os_str().as_bytes()],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Insert every path for a version and return the resulting file table
    pub fn insert_all<I, P>(conn: &Connection, version_id: i64, paths: I) -> Result<FileTable>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut stmt = conn.prepare("INSERT INTO files (version_id, path) VALUES (?1, ?2)")?;
        let mut table = FileTable::new();

        for path in paths {
            let path = path.as_ref();
            stmt.execute(params![version_id, path.as_os_str().as_bytes()])?;
            table.insert(path.to_path_buf(), conn.last_insert_rowid());
        }

        Ok(table)
    }

    /// Find all files belonging to a version
    pub fn find_by_version(conn: &Connection, version_id: i64) -> Result<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, version_id, path FROM files WHERE version_id = ?1 ORDER BY id")?;

        let files = stmt
            .query_map([version_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Rebuild the file table of a version from the database
    pub fn table_for_version(conn: &Connection, version_id: i64) -> Result<FileTable> {
        Ok(Self::find_by_version(conn, version_id)?
            .into_iter()
            .filter_map(|f| f.id.map(|id| (f.path, id)))
            .collect())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let path: Vec<u8> = row.get(2)?;
        Ok(Self {
            id: Some(row.get(0)?),
            version_id: row.get(1)?,
            path: PathBuf::from(OsStr::from_bytes(&path)),
        })
    }
}
