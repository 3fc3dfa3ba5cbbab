// src/hooks/mod.rs
//! Hook framework for per-package metadata extraction
//!
//! Hooks react to package lifecycle events and derive metadata from the
//! extracted tree. Each hook may keep a sidecar file next to the package
//! directory (`{version}.checksums`, `{version}.ctags`, ...) and rows in the
//! database; the two halves are gated by the `hooks.fs` and `hooks.db`
//! passes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Updater                     │
//! │  (builds HookContext once per package)       │
//! └──────────────────────────────────────────────┘
//!                       │ notify(event, ctx)
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │                HookRegistry                  │
//! │  (subscribers per event, extension owners)   │
//! └──────────────────────────────────────────────┘
//!                       │ in subscription order
//!        ┌──────────┬───┴──────┬───────────┐
//!        ▼          ▼          ▼           ▼
//!   checksums     ctags     metrics    sloccount
//! ```
//!
//! Every built-in hook computes its sidecar only when it is missing, writes
//! it through a temporary file, and inserts rows only when none exist yet
//! for the version. The updater wraps each package in a savepoint so a
//! version never ends up with a partial row set.

mod checksums;
mod ctags;
mod metrics;
mod registry;
mod sloccount;
#[cfg(test)]
mod test_support;

pub use checksums::{CHECKSUMS_EXT, ChecksumsHook, parse_checksums};
pub use ctags::{CtagsHook, ParsedTag, parse_ctags};
pub use metrics::{MetricsHook, parse_du_output};
pub use registry::{HookRegistry, Registrar};
pub use sloccount::{SloccountHook, parse_sloccount};

use crate::config::{Pass, Passes};
use crate::db::models::{FileTable, Version};
use crate::error::{Error, Result};
use crate::mirror::SourcePackage;
use rusqlite::Connection;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Package lifecycle events hooks can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookEvent {
    /// Package was extracted and recorded; its files are in the file table
    AddPackage,
    /// Package is about to be removed; tree and rows still exist
    RmPackage,
}

impl HookEvent {
    pub const ALL: [HookEvent; 2] = [HookEvent::AddPackage, HookEvent::RmPackage];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::AddPackage => "add-package",
            HookEvent::RmPackage => "rm-package",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HookEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// Everything a hook callback gets to see about one package
pub struct HookContext<'a> {
    pub conn: &'a Connection,
    pub pkg: &'a SourcePackage,
    /// Extraction directory of the package
    pub pkgdir: &'a Path,
    /// Relative path -> file id; built once by the updater, never mutated
    pub file_table: &'a FileTable,
    pub passes: &'a Passes,
}

impl HookContext<'_> {
    /// Whether the hook may touch its sidecar file
    pub fn fs_enabled(&self) -> bool {
        self.passes.contains(Pass::HooksFs)
    }

    /// Whether the hook may touch its database rows
    pub fn db_enabled(&self) -> bool {
        self.passes.contains(Pass::HooksDb)
    }

    /// The stored version of the package, required by database phases
    pub fn version_id(&self) -> Result<i64> {
        Version::lookup(self.conn, self.pkg.name(), self.pkg.version())?
            .and_then(|v| v.id)
            .ok_or_else(|| {
                Error::NotFoundError(format!("{} is not in the database", self.pkg))
            })
    }

    /// `pkgdir` plus a sidecar extension
    pub fn sidecar(&self, ext: &str) -> PathBuf {
        crate::storage::sidecar_path(self.pkgdir, ext)
    }
}

/// A metadata extraction plugin
pub trait Hook: Send + Sync {
    /// Name used in configuration and forced triggers
    fn name(&self) -> &'static str;

    /// Subscribe to events and claim sidecar extensions
    fn init(&self, registrar: &mut Registrar<'_>) -> Result<()>;

    fn add_package(&self, ctx: &HookContext<'_>) -> Result<()>;

    fn rm_package(&self, ctx: &HookContext<'_>) -> Result<()>;

    /// Dispatch an event to the matching callback
    fn handle(&self, event: HookEvent, ctx: &HookContext<'_>) -> Result<()> {
        match event {
            HookEvent::AddPackage => self.add_package(ctx),
            HookEvent::RmPackage => self.rm_package(ctx),
        }
    }
}

/// Look up a built-in hook by its configuration name
pub fn builtin(name: &str) -> Option<Arc<dyn Hook>> {
    match name {
        "checksums" => Some(Arc::new(ChecksumsHook)),
        "ctags" => Some(Arc::new(CtagsHook::new())),
        "metrics" => Some(Arc::new(MetricsHook::new())),
        "sloccount" => Some(Arc::new(SloccountHook::new())),
        _ => None,
    }
}

/// Names of all built-in hooks
pub const BUILTIN_HOOKS: [&str; 4] = ["checksums", "ctags", "metrics", "sloccount"];

/// Remove a hook's sidecar file if present
pub(crate) fn remove_sidecar(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
