// src/mirror/mod.rs

//! Local Debian source mirror
//!
//! A mirror is a directory with `dists/<suite>/<component>/source/Sources*`
//! indices and a `pool/` holding the actual source packages. Listing the
//! mirror yields every distinct `(name, version)` once while recording which
//! suites list which packages.

pub mod deb822;
mod package;

pub use package::{PackageId, SourcePackage, pkg_prefix};

use crate::error::{Error, Result};
use deb822::Paragraphs;
use flate2::read::GzDecoder;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xz2::read::XzDecoder;

/// Compressed index variants, most preferred first
const SOURCES_COMPRESSIONS: [Compression; 3] =
    [Compression::Gzip, Compression::Xz, Compression::None];

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Gzip,
    Xz,
    None,
}

impl Compression {
    fn file_name(&self) -> &'static str {
        match self {
            Compression::Gzip => "Sources.gz",
            Compression::Xz => "Sources.xz",
            Compression::None => "Sources",
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Some(Compression::Gzip),
            Some("xz") => Some(Compression::Xz),
            None => Some(Compression::None),
            Some(_) => None,
        }
    }

    /// Detect from magic bytes when the extension is unhelpful
    fn sniff(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 6];
        let n = file.read(&mut magic)?;

        if n >= 2 && magic[..2] == GZIP_MAGIC {
            Ok(Compression::Gzip)
        } else if n >= 6 && magic == XZ_MAGIC {
            Ok(Compression::Xz)
        } else {
            Ok(Compression::None)
        }
    }
}

/// Open an index file, transparently decompressing it
fn open_index(path: &Path) -> Result<Box<dyn BufRead>> {
    let compression = match Compression::from_path(path) {
        Some(c) => c,
        None => Compression::sniff(path)?,
    };
    let file = File::open(path)?;

    Ok(match compression {
        Compression::Gzip => Box::new(BufReader::new(GzDecoder::new(file))),
        Compression::Xz => Box::new(BufReader::new(XzDecoder::new(file))),
        Compression::None => Box::new(BufReader::new(file)),
    })
}

/// Suite -> packages it lists (index order), plus the deduplicated set of
/// every package in the mirror
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub suites: BTreeMap<String, Vec<PackageId>>,
    pub packages: HashSet<PackageId>,
}

/// Handle on a local source mirror
#[derive(Debug)]
pub struct SourceMirror {
    root: PathBuf,
    catalog: Option<Catalog>,
}

impl SourceMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dists_dir(&self) -> PathBuf {
        self.root.join("dists")
    }

    /// Locate every `(suite, index)` pair, picking one compression variant
    /// per index directory
    fn find_sources(&self) -> Result<Vec<(String, PathBuf)>> {
        let dists = self.dists_dir();
        if !dists.is_dir() {
            return Err(Error::Mirror {
                path: dists,
                message: "no dists/ directory".to_string(),
            });
        }

        let mut dirs = BTreeSet::new();
        for entry in WalkDir::new(&dists).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            if entry.path().file_stem().is_some_and(|stem| stem == "Sources") {
                if let Some(parent) = entry.path().parent() {
                    dirs.insert(parent.to_path_buf());
                }
            }
        }

        let mut indices = Vec::new();
        for dir in dirs {
            let Some(index) = SOURCES_COMPRESSIONS
                .iter()
                .map(|c| dir.join(c.file_name()))
                .find(|p| p.is_file())
            else {
                warn!("no supported variant of Sources in {}", dir.display());
                continue;
            };

            // dists/<suite>/<component>/source/Sources.gz
            let suite = index
                .components()
                .rev()
                .nth(3)
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .ok_or_else(|| Error::Mirror {
                    path: index.clone(),
                    message: "index too shallow to name a suite".to_string(),
                })?;
            indices.push((suite, index));
        }

        Ok(indices)
    }

    /// Lazily list every distinct package of the mirror.
    ///
    /// The suite and package catalogs are rebuilt as a side effect and become
    /// available through [`SourceMirror::catalog`] only once the listing has
    /// been consumed to the end without errors.
    pub fn ls(&mut self) -> Result<Listing<'_>> {
        self.catalog = None;
        let indices = self.find_sources()?;
        Ok(Listing::new(self, indices, true))
    }

    /// List the packages of one suite only. Catalogs are left untouched.
    pub fn ls_suite(&mut self, suite: &str) -> Result<Listing<'_>> {
        let indices = self
            .find_sources()?
            .into_iter()
            .filter(|(s, _)| s == suite)
            .collect();
        Ok(Listing::new(self, indices, false))
    }

    /// Catalog built by the last complete `ls()`, if any
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Catalog of the mirror, running a full listing first if needed
    pub fn ensure_catalog(&mut self) -> Result<&Catalog> {
        if self.catalog.is_none() {
            for pkg in self.ls()? {
                pkg?;
            }
        }
        self.catalog.as_ref().ok_or_else(|| Error::Mirror {
            path: self.root.clone(),
            message: "mirror listing did not complete".to_string(),
        })
    }

    /// Suite -> package list
    pub fn suites(&mut self) -> Result<&BTreeMap<String, Vec<PackageId>>> {
        Ok(&self.ensure_catalog()?.suites)
    }

    /// Every package in the mirror
    pub fn packages(&mut self) -> Result<&HashSet<PackageId>> {
        Ok(&self.ensure_catalog()?.packages)
    }

    /// Suite directories under `dists/`, skipping symlinked aliases
    pub fn ls_suites(&self) -> Result<Vec<String>> {
        let mut suites = Vec::new();
        for entry in fs::read_dir(self.dists_dir())? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() && !file_type.is_symlink() {
                suites.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        suites.sort();
        Ok(suites)
    }

    /// Suites with the aliases pointing at them, e.g. `sid -> [unstable]`
    pub fn ls_suites_with_aliases(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut suites: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for suite in self.ls_suites()? {
            suites.entry(suite).or_default();
        }

        for entry in fs::read_dir(self.dists_dir())? {
            let entry = entry?;
            if !entry.file_type()?.is_symlink() {
                continue;
            }
            let alias = entry.file_name().to_string_lossy().into_owned();
            let target = fs::read_link(entry.path())?;
            let Some(target) = target.file_name() else {
                continue;
            };
            let target = target.to_string_lossy().into_owned();
            if let Some(aliases) = suites.get_mut(&target) {
                aliases.push(alias);
            } else {
                debug!("ignoring dangling suite alias {} -> {}", alias, target);
            }
        }

        for aliases in suites.values_mut() {
            aliases.sort();
        }
        Ok(suites)
    }

    /// Pool prefixes present on disk, across all areas
    pub fn pkg_prefixes(&self) -> Result<Vec<String>> {
        let mut prefixes = BTreeSet::new();
        for area in fs::read_dir(self.root.join("pool"))? {
            let area = area?;
            if !area.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(area.path())? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    prefixes.insert(entry.file_name().to_string_lossy().into_owned());
                }
            }
        }
        Ok(prefixes.into_iter().collect())
    }
}

/// One-shot iterator returned by [`SourceMirror::ls`]
pub struct Listing<'a> {
    mirror: &'a mut SourceMirror,
    indices: std::vec::IntoIter<(String, PathBuf)>,
    current: Option<(String, Paragraphs<Box<dyn BufRead>>)>,
    catalog: Catalog,
    record_catalog: bool,
    failed: bool,
}

impl<'a> Listing<'a> {
    fn new(mirror: &'a mut SourceMirror, indices: Vec<(String, PathBuf)>, record: bool) -> Self {
        Self {
            mirror,
            indices: indices.into_iter(),
            current: None,
            catalog: Catalog::default(),
            record_catalog: record,
            failed: false,
        }
    }

    fn finish(&mut self) {
        if self.record_catalog && !self.failed {
            self.mirror.catalog = Some(std::mem::take(&mut self.catalog));
            self.record_catalog = false;
        }
    }

    fn fail(&mut self, e: Error) -> Option<Result<SourcePackage>> {
        self.failed = true;
        self.current = None;
        Some(Err(e))
    }
}

impl Iterator for Listing<'_> {
    type Item = Result<SourcePackage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if self.current.is_none() {
                let Some((suite, index)) = self.indices.next() else {
                    self.finish();
                    return None;
                };
                info!("Reading sources index {}", index.display());
                match open_index(&index) {
                    Ok(reader) => self.current = Some((suite, Paragraphs::new(reader))),
                    Err(e) => return self.fail(e),
                }
            }

            let Some((suite, paragraphs)) = self.current.as_mut() else {
                continue;
            };
            let paragraph = match paragraphs.next() {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Err(e)) => return self.fail(e),
                Some(Ok(p)) => p,
            };

            let pkg = match SourcePackage::from_paragraph(paragraph, &self.mirror.root) {
                Ok(pkg) => pkg,
                Err(e) => {
                    warn!("skipping malformed entry in suite {}: {}", suite, e);
                    continue;
                }
            };

            self.catalog
                .suites
                .entry(suite.clone())
                .or_default()
                .push(pkg.id().clone());

            if self.catalog.packages.insert(pkg.id().clone()) {
                return Some(Ok(pkg));
            }
        }
    }
}
