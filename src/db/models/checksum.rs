// src/db/models/checksum.rs

//! Checksum model - SHA-256 of each file in a version

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub id: Option<i64>,
    pub version_id: i64,
    pub file_id: i64,
    pub sha256: String,
}

impl Checksum {
    pub fn new(version_id: i64, file_id: i64, sha256: String) -> Self {
        Self {
            id: None,
            version_id,
            file_id,
            sha256,
        }
    }

    /// Insert a batch of checksums, returning how many rows were written
    pub fn insert_all(conn: &Connection, checksums: &[Checksum]) -> Result<usize> {
        let mut stmt = conn.prepare(
            "INSERT INTO checksums (version_id, file_id, sha256) VALUES (?1, ?2, ?3)",
        )?;
        for checksum in checksums {
            stmt.execute(params![checksum.version_id, checksum.file_id, &checksum.sha256])?;
        }
        Ok(checksums.len())
    }

    /// Whether any checksum was recorded for a version
    pub fn exists_for_version(conn: &Connection, version_id: i64) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM checksums WHERE version_id = ?1 LIMIT 1",
                [version_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn find_by_version(conn: &Connection, version_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, version_id, file_id, sha256 FROM checksums WHERE version_id = ?1 ORDER BY id",
        )?;
        let checksums = stmt
            .query_map([version_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(checksums)
    }

    pub fn delete_by_version(conn: &Connection, version_id: i64) -> Result<usize> {
        Ok(conn.execute("DELETE FROM checksums WHERE version_id = ?1", [version_id])?)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            version_id: row.get(1)?,
            file_id: row.get(2)?,
            sha256: row.get(3)?,
        })
    }
}
