// src/db/models/mod.rs

//! Data models for the metadata store
//!
//! Each struct mirrors one table and carries the queries the synchronizer
//! and the hooks need. Package and version rows are owned by the updater;
//! the metadata rows are owned by the hook that produces them.

mod checksum;
mod ctag;
mod file;
mod metric;
mod package;
mod sloccount;
mod suite;
mod version;

pub use checksum::Checksum;
pub use ctag::Ctag;
pub use file::{File, FileTable};
pub use metric::Metric;
pub use package::Package;
pub use sloccount::SlocCount;
pub use suite::{Suite, SuiteAlias, SuiteMapping};
pub use version::{Area, VcsType, Version};
