// src/db/models/package.rs

//! Package model - one row per source package name

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A source package name, shared by all of its versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: Option<i64>,
    pub name: String,
}

impl Package {
    pub fn new(name: String) -> Self {
        Self { id: None, name }
    }

    /// Insert this package into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute("INSERT INTO packages (name) VALUES (?1)", params![&self.name])?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a package by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare("SELECT id, name FROM packages WHERE name = ?1")?;
        let package = stmt.query_row([name], Self::from_row).optional()?;
        Ok(package)
    }

    /// Return the id of `name`, creating the row if it does not exist yet
    pub fn find_or_create(conn: &Connection, name: &str) -> Result<i64> {
        if let Some(Package { id: Some(id), .. }) = Self::find_by_name(conn, name)? {
            return Ok(id);
        }
        Package::new(name.to_string()).insert(conn)
    }

    /// Number of versions recorded for a package
    pub fn version_count(conn: &Connection, id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM versions WHERE package_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete the package if no version refers to it any more.
    /// Returns whether the row was removed.
    pub fn delete_if_orphaned(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM packages WHERE id = ?1
             AND NOT EXISTS (SELECT 1 FROM versions WHERE package_id = ?1)",
            [id],
        )?;
        Ok(deleted > 0)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
        })
    }
}
