// src/db/models/sloccount.rs

//! SlocCount model - lines of code per language for a version

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlocCount {
    pub id: Option<i64>,
    pub version_id: i64,
    pub language: String,
    pub count: i64,
}

impl SlocCount {
    pub fn new(version_id: i64, language: String, count: i64) -> Self {
        Self {
            id: None,
            version_id,
            language,
            count,
        }
    }

    pub fn insert_all(conn: &Connection, counts: &[SlocCount]) -> Result<usize> {
        let mut stmt = conn.prepare(
            "INSERT INTO sloccounts (version_id, language, count) VALUES (?1, ?2, ?3)",
        )?;
        for count in counts {
            stmt.execute(params![count.version_id, &count.language, count.count])?;
        }
        Ok(counts.len())
    }

    pub fn exists_for_version(conn: &Connection, version_id: i64) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM sloccounts WHERE version_id = ?1 LIMIT 1",
                [version_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn find_by_version(conn: &Connection, version_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, version_id, language, count FROM sloccounts
             WHERE version_id = ?1 ORDER BY language",
        )?;
        let counts = stmt
            .query_map([version_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    pub fn delete_by_version(conn: &Connection, version_id: i64) -> Result<usize> {
        Ok(conn.execute("DELETE FROM sloccounts WHERE version_id = ?1", [version_id])?)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            version_id: row.get(1)?,
            language: row.get(2)?,
            count: row.get(3)?,
        })
    }
}
