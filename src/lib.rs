// src/lib.rs

//! srcmirror - Debian source mirror synchronizer
//!
//! Keeps an extracted copy of every source package of a local Debian mirror,
//! together with per-package metadata, in step with the mirror.
//!
//! # Architecture
//!
//! - Mirror index: `Sources` indices parsed into a suite -> package catalog
//! - Filesystem store: `{area}/{prefix}/{package}/{version}` trees plus
//!   per-hook sidecar files
//! - Metadata store: SQLite; deleting a version cascades to everything
//!   derived from it
//! - Hooks: checksums, ctags, sloccount and disk usage, each idempotent
//! - Updater: adds new packages, rebuilds suite mappings, collects gone ones
//! - Archiver: sticky suites kept after they leave the live mirror

pub mod archiver;
pub mod config;
pub mod db;
mod error;
pub mod exclude;
pub mod hash;
pub mod hooks;
pub mod mirror;
pub mod releases;
pub mod storage;
pub mod updater;

pub use archiver::{ArchiveReport, Archiver, SuiteStatus};
pub use config::{Pass, Passes, Stage, SyncConfig};
pub use error::{Error, Result};
pub use hooks::{Hook, HookContext, HookEvent, HookRegistry};
pub use mirror::{PackageId, SourceMirror, SourcePackage};
pub use storage::{DpkgSource, Unpacker};
pub use updater::{UpdatePlan, UpdateReport, Updater};
