// src/db/models/version.rs

//! Version model - one extracted version of a source package

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fmt;
use std::str::FromStr;

/// Archive area a source package belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Area {
    #[default]
    Main,
    Contrib,
    NonFree,
}

impl Area {
    pub const ALL: [Area; 3] = [Area::Main, Area::Contrib, Area::NonFree];

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Main => "main",
            Area::Contrib => "contrib",
            Area::NonFree => "non-free",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "main" => Ok(Area::Main),
            "contrib" => Ok(Area::Contrib),
            "non-free" => Ok(Area::NonFree),
            _ => Err(format!("Invalid archive area: {s}")),
        }
    }
}

/// Version control systems recognized in `Vcs-<type>` fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsType {
    Arch,
    Bzr,
    Cvs,
    Darcs,
    Git,
    Hg,
    Mtn,
    Svn,
}

impl VcsType {
    pub const ALL: [VcsType; 8] = [
        VcsType::Arch,
        VcsType::Bzr,
        VcsType::Cvs,
        VcsType::Darcs,
        VcsType::Git,
        VcsType::Hg,
        VcsType::Mtn,
        VcsType::Svn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VcsType::Arch => "arch",
            VcsType::Bzr => "bzr",
            VcsType::Cvs => "cvs",
            VcsType::Darcs => "darcs",
            VcsType::Git => "git",
            VcsType::Hg => "hg",
            VcsType::Mtn => "mtn",
            VcsType::Svn => "svn",
        }
    }
}

impl FromStr for VcsType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        VcsType::ALL
            .into_iter()
            .find(|vcs| vcs.as_str() == s)
            .ok_or_else(|| format!("Invalid VCS type: {s}"))
    }
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

/// A package version known to the store
///
/// `name` is denormalized from `packages` when loading and ignored on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub id: Option<i64>,
    pub package_id: i64,
    pub name: String,
    pub vnumber: String,
    pub area: Area,
    pub vcs_type: Option<VcsType>,
    pub vcs_url: Option<String>,
    pub vcs_browser: Option<String>,
    pub sticky: bool,
}

const SELECT_VERSION: &str = "SELECT v.id, v.package_id, p.name, v.vnumber, v.area, v.vcs_type,
            v.vcs_url, v.vcs_browser, v.sticky
     FROM versions v JOIN packages p ON p.id = v.package_id";

impl Version {
    pub fn new(package_id: i64, name: String, vnumber: String, area: Area) -> Self {
        Self {
            id: None,
            package_id,
            name,
            vnumber,
            area,
            vcs_type: None,
            vcs_url: None,
            vcs_browser: None,
            sticky: false,
        }
    }

    /// Insert this version into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO versions (package_id, vnumber, area, vcs_type, vcs_url, vcs_browser, sticky)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &self.package_id,
                &self.vnumber,
                self.area.as_str(),
                self.vcs_type.map(|v| v.as_str()),
                &self.vcs_url,
                &self.vcs_browser,
                &self.sticky,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a version by id
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("{SELECT_VERSION} WHERE v.id = ?1"))?;
        let version = stmt.query_row([id], Self::from_row).optional()?;
        Ok(version)
    }

    /// Look up a (package, version) pair
    pub fn lookup(conn: &Connection, name: &str, vnumber: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_VERSION} WHERE p.name = ?1 AND v.vnumber = ?2"
        ))?;
        let version = stmt
            .query_row(params![name, vnumber], Self::from_row)
            .optional()?;
        Ok(version)
    }

    /// List versions not protected by a sticky suite
    pub fn list_non_sticky(conn: &Connection) -> Result<Vec<Self>> {
        Self::query(
            conn,
            &format!("{SELECT_VERSION} WHERE v.sticky = 0 ORDER BY p.name, v.vnumber"),
            [],
        )
    }

    /// List sticky versions mapped to `suite`
    pub fn list_sticky_in_suite(conn: &Connection, suite: &str) -> Result<Vec<Self>> {
        Self::query(
            conn,
            &format!(
                "{SELECT_VERSION} JOIN suite_mappings m ON m.version_id = v.id
                 WHERE v.sticky = 1 AND m.suite = ?1 ORDER BY p.name, v.vnumber"
            ),
            [suite],
        )
    }

    /// Set or clear the sticky flag
    pub fn set_sticky(conn: &Connection, id: i64, sticky: bool) -> Result<()> {
        conn.execute(
            "UPDATE versions SET sticky = ?1 WHERE id = ?2",
            params![sticky, id],
        )?;
        Ok(())
    }

    /// Delete a version; files, mappings and hook metadata cascade
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM versions WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Total number of versions in the store
    pub fn count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))?;
        Ok(count)
    }

    fn query<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(sql)?;
        let versions = stmt
            .query_map(params, Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let area: String = row.get(4)?;
        let area = area.parse::<Area>().map_err(|e| conversion_error(4, e))?;
        let vcs_type = row
            .get::<_, Option<String>>(5)?
            .map(|s| s.parse::<VcsType>())
            .transpose()
            .map_err(|e| conversion_error(5, e))?;

        Ok(Self {
            id: Some(row.get(0)?),
            package_id: row.get(1)?,
            name: row.get(2)?,
            vnumber: row.get(3)?,
            area,
            vcs_type,
            vcs_url: row.get(6)?,
            vcs_browser: row.get(7)?,
            sticky: row.get(8)?,
        })
    }
}
