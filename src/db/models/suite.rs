// src/db/models/suite.rs

//! Suite models - suite records, aliases and version membership

use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeSet;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A suite known to the store, live or sticky
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub id: Option<i64>,
    pub name: String,
    pub sticky: bool,
    /// Release number for known releases
    pub version: Option<String>,
    pub release_date: Option<NaiveDate>,
}

impl Suite {
    pub fn new(name: String, sticky: bool) -> Self {
        Self {
            id: None,
            name,
            sticky,
            version: None,
            release_date: None,
        }
    }

    /// Insert this suite into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO suites (name, sticky, version, release_date) VALUES (?1, ?2, ?3, ?4)",
            params![
                &self.name,
                &self.sticky,
                &self.version,
                self.release_date.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a suite by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, sticky, version, release_date FROM suites WHERE name = ?1",
        )?;
        let suite = stmt.query_row([name], Self::from_row).optional()?;
        Ok(suite)
    }

    /// List suites, sticky ones only if `sticky_only`
    pub fn list(conn: &Connection, sticky_only: bool) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, sticky, version, release_date FROM suites
             WHERE sticky = 1 OR ?1 = 0 ORDER BY name",
        )?;
        let suites = stmt
            .query_map([sticky_only], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(suites)
    }

    /// Delete a suite record by name; aliases cascade
    pub fn delete_by_name(conn: &Connection, name: &str) -> Result<()> {
        conn.execute("DELETE FROM suites WHERE name = ?1", [name])?;
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let release_date: Option<String> = row.get(4)?;
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            sticky: row.get(2)?,
            version: row.get(3)?,
            release_date: release_date
                .and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        })
    }
}

/// Alternative name for a suite, e.g. `unstable` for `sid`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteAlias {
    pub alias: String,
    pub suite_id: i64,
}

impl SuiteAlias {
    pub fn new(alias: String, suite_id: i64) -> Self {
        Self { alias, suite_id }
    }

    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO suite_aliases (alias, suite_id) VALUES (?1, ?2)",
            params![&self.alias, &self.suite_id],
        )?;
        Ok(())
    }

    /// Forget every alias; they are rebuilt from the mirror on each run
    pub fn delete_all(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM suite_aliases", [])?)
    }

    /// Aliases pointing at a suite
    pub fn find_by_suite(conn: &Connection, suite_id: i64) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT alias FROM suite_aliases WHERE suite_id = ?1 ORDER BY alias")?;
        let aliases = stmt
            .query_map([suite_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(aliases)
    }
}

/// Edge between a version and a suite name.
///
/// Mappings are a lookup table: deleting one never deletes the version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteMapping {
    pub id: Option<i64>,
    pub version_id: i64,
    pub suite: String,
}

impl SuiteMapping {
    pub fn new(version_id: i64, suite: String) -> Self {
        Self {
            id: None,
            version_id,
            suite,
        }
    }

    /// Insert the mapping unless it already exists.
    /// Returns whether a row was written.
    pub fn insert_if_missing(&mut self, conn: &Connection) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO suite_mappings (version_id, suite) VALUES (?1, ?2)",
            params![&self.version_id, &self.suite],
        )?;
        if inserted > 0 {
            self.id = Some(conn.last_insert_rowid());
        }
        Ok(inserted > 0)
    }

    pub fn exists(conn: &Connection, version_id: i64, suite: &str) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM suite_mappings WHERE version_id = ?1 AND suite = ?2",
                params![version_id, suite],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Suites other than `suite` that map to a version
    pub fn other_suites(conn: &Connection, version_id: i64, suite: &str) -> Result<BTreeSet<String>> {
        let mut stmt = conn.prepare(
            "SELECT suite FROM suite_mappings WHERE version_id = ?1 AND suite != ?2",
        )?;
        let suites = stmt
            .query_map(params![version_id, suite], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(suites)
    }

    /// Number of versions mapped to a suite
    pub fn count_in_suite(conn: &Connection, suite: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM suite_mappings WHERE suite = ?1",
            [suite],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Remove one version's mapping to a suite
    pub fn delete(conn: &Connection, version_id: i64, suite: &str) -> Result<()> {
        conn.execute(
            "DELETE FROM suite_mappings WHERE version_id = ?1 AND suite = ?2",
            params![version_id, suite],
        )?;
        Ok(())
    }

    /// Remove every mapping of a suite
    pub fn delete_suite(conn: &Connection, suite: &str) -> Result<usize> {
        Ok(conn.execute("DELETE FROM suite_mappings WHERE suite = ?1", [suite])?)
    }
}
