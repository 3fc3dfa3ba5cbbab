// src/db/models/ctag.rs

//! Ctag model - symbol definitions found in a version

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctag {
    pub id: Option<i64>,
    pub version_id: i64,
    pub file_id: i64,
    pub tag: String,
    pub line: i64,
    pub kind: Option<String>,
    pub language: Option<String>,
}

impl Ctag {
    pub fn insert_all(conn: &Connection, ctags: &[Ctag]) -> Result<usize> {
        let mut stmt = conn.prepare(
            "INSERT INTO ctags (version_id, file_id, tag, line, kind, language)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for ctag in ctags {
            stmt.execute(params![
                ctag.version_id,
                ctag.file_id,
                &ctag.tag,
                ctag.line,
                &ctag.kind,
                &ctag.language,
            ])?;
        }
        Ok(ctags.len())
    }

    pub fn exists_for_version(conn: &Connection, version_id: i64) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM ctags WHERE version_id = ?1 LIMIT 1",
                [version_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn find_by_version(conn: &Connection, version_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, version_id, file_id, tag, line, kind, language
             FROM ctags WHERE version_id = ?1 ORDER BY id",
        )?;
        let ctags = stmt
            .query_map([version_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ctags)
    }

    pub fn delete_by_version(conn: &Connection, version_id: i64) -> Result<usize> {
        Ok(conn.execute("DELETE FROM ctags WHERE version_id = ?1", [version_id])?)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            version_id: row.get(1)?,
            file_id: row.get(2)?,
            tag: row.get(3)?,
            line: row.get(4)?,
            kind: row.get(5)?,
            language: row.get(6)?,
        })
    }
}
