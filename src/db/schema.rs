// src/db/schema.rs

//! Database schema definitions and migrations
//!
//! Every table that describes a package version references `versions(id)`
//! with `ON DELETE CASCADE`, so removing a version row is enough to drop its
//! files, suite mappings and hook metadata.

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("Schema migration complete. Now at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::InitError(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Initial schema - Version 1
///
/// - packages / versions: one row per source package name and per version
/// - files: paths inside an extracted version, referenced by hook metadata
/// - suites / suite_aliases / suite_mappings: suite membership
/// - checksums / ctags / sloccounts / metrics: hook metadata
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            package_id INTEGER NOT NULL,
            vnumber TEXT NOT NULL,
            area TEXT NOT NULL CHECK(area IN ('main', 'contrib', 'non-free')),
            vcs_type TEXT CHECK(vcs_type IN ('arch', 'bzr', 'cvs', 'darcs', 'git', 'hg', 'mtn', 'svn')),
            vcs_url TEXT,
            vcs_browser TEXT,
            sticky INTEGER NOT NULL DEFAULT 0,
            UNIQUE(package_id, vnumber),
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_versions_vnumber ON versions(vnumber);
        CREATE INDEX idx_versions_sticky ON versions(sticky);

        -- Paths are stored as raw bytes; source trees are not always UTF-8
        CREATE TABLE files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL,
            path BLOB NOT NULL,
            UNIQUE(version_id, path),
            FOREIGN KEY (version_id) REFERENCES versions(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_files_path ON files(path);

        CREATE TABLE suites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            sticky INTEGER NOT NULL DEFAULT 0,
            version TEXT,
            release_date TEXT
        );

        CREATE TABLE suite_aliases (
            alias TEXT PRIMARY KEY,
            suite_id INTEGER NOT NULL,
            FOREIGN KEY (suite_id) REFERENCES suites(id) ON DELETE CASCADE
        );

        CREATE TABLE suite_mappings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL,
            suite TEXT NOT NULL,
            UNIQUE(version_id, suite),
            FOREIGN KEY (version_id) REFERENCES versions(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_suite_mappings_suite ON suite_mappings(suite);

        CREATE TABLE checksums (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL,
            file_id INTEGER NOT NULL,
            sha256 TEXT NOT NULL CHECK(length(sha256) = 64),
            FOREIGN KEY (version_id) REFERENCES versions(id) ON DELETE CASCADE,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_checksums_version ON checksums(version_id);
        CREATE INDEX idx_checksums_sha256 ON checksums(sha256);

        CREATE TABLE ctags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL,
            file_id INTEGER NOT NULL,
            tag TEXT NOT NULL,
            line INTEGER NOT NULL,
            kind TEXT,
            language TEXT,
            FOREIGN KEY (version_id) REFERENCES versions(id) ON DELETE CASCADE,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_ctags_version ON ctags(version_id);
        CREATE INDEX idx_ctags_tag ON ctags(tag);

        CREATE TABLE sloccounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL,
            language TEXT NOT NULL,
            count INTEGER NOT NULL,
            UNIQUE(version_id, language),
            FOREIGN KEY (version_id) REFERENCES versions(id) ON DELETE CASCADE
        );

        CREATE TABLE metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL,
            metric TEXT NOT NULL,
            value INTEGER NOT NULL,
            UNIQUE(version_id, metric),
            FOREIGN KEY (version_id) REFERENCES versions(id) ON DELETE CASCADE
        );
        ",
    )?;

    info!("Schema version 1 created successfully");
    Ok(())
}
