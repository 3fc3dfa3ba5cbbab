// src/exclude.rs

//! Exclusion rules for packages and files
//!
//! Rules are deb822 stanzas. A stanza without `Files` excludes a whole
//! package (optionally only one version of it); a stanza with `Files`
//! removes matching paths from an extracted package before anything is
//! recorded about them.
//!
//! ```text
//! Explanation: non-free test data
//! Package: bsdgames-nonfree
//! Files: tests/battlestar.in17 tests/*.bin
//!
//! Package: linux-grsec
//! Version: 3.2.0-1
//! ```

use crate::error::{Error, Result};
use crate::mirror::SourcePackage;
use crate::mirror::deb822::{Paragraph, Paragraphs};
use glob::{MatchOptions, Pattern};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Shell-style matching: `*` stops at `/` and does not match hidden names
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Parsed exclusion rules
#[derive(Debug, Clone, Default)]
pub struct ExcludeSpecs {
    stanzas: Vec<Paragraph>,
}

impl ExcludeSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let stanzas = Paragraphs::new(reader).collect::<Result<Vec<_>>>()?;
        for stanza in &stanzas {
            if !stanza.contains("Package") {
                return Err(Error::Config(
                    "exclusion stanza without Package field".to_string(),
                ));
            }
        }
        Ok(Self { stanzas })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(BufReader::new(file))
    }

    /// Rules from `path`, or none at all
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::new()), Self::load)
    }

    pub fn len(&self) -> usize {
        self.stanzas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stanzas.is_empty()
    }

    /// Whether a package-level stanza matches `pkg`
    pub fn is_excluded_package(&self, pkg: &SourcePackage) -> bool {
        self.stanzas.iter().any(|spec| {
            !spec.contains("Files")
                && spec.get("Package") == Some(pkg.name())
                && spec.get("Version").is_none_or(|v| v == pkg.version())
        })
    }

    /// The subset of `files` (relative to the package directory) matched by
    /// a file-level stanza for `pkg`
    pub fn excluded_files<'a, I>(&self, pkg: &SourcePackage, files: I) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        let patterns = self
            .stanzas
            .iter()
            .filter(|spec| spec.get("Package") == Some(pkg.name()))
            .filter_map(|spec| spec.get("Files"))
            .flat_map(str::split_whitespace)
            .map(Pattern::new)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        Ok(files
            .into_iter()
            .filter(|path| {
                patterns
                    .iter()
                    .any(|pat| pat.matches_path_with(path, MATCH_OPTIONS))
            })
            .cloned()
            .collect())
    }
}
