// src/db/models/metric.rs

//! Metric model - named numeric facts about a version (e.g. disk size)

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub id: Option<i64>,
    pub version_id: i64,
    pub metric: String,
    pub value: i64,
}

impl Metric {
    pub fn new(version_id: i64, metric: String, value: i64) -> Self {
        Self {
            id: None,
            version_id,
            metric,
            value,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO metrics (version_id, metric, value) VALUES (?1, ?2, ?3)",
            params![&self.version_id, &self.metric, &self.value],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Value of one metric for a version
    pub fn find(conn: &Connection, version_id: i64, metric: &str) -> Result<Option<i64>> {
        let value = conn
            .query_row(
                "SELECT value FROM metrics WHERE version_id = ?1 AND metric = ?2",
                params![version_id, metric],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn delete(conn: &Connection, version_id: i64, metric: &str) -> Result<usize> {
        Ok(conn.execute(
            "DELETE FROM metrics WHERE version_id = ?1 AND metric = ?2",
            params![version_id, metric],
        )?)
    }
}
