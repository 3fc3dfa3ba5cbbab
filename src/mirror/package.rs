// src/mirror/package.rs

//! Source packages as listed in a mirror's `Sources` indices

use super::deb822::Paragraph;
use crate::db::models::{Area, VcsType, Version};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::warn;

/// `(name, version)` identity of a source package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    pub name: String,
    pub version: String,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Pool prefix of a package name: `libX` for libraries, else the first letter
pub fn pkg_prefix(name: &str) -> String {
    let prefix: String = if name.starts_with("lib") {
        name.chars().take(4).collect()
    } else {
        name.chars().take(1).collect()
    };
    prefix.to_lowercase()
}

/// A source package paragraph from a mirror index.
///
/// Equality, ordering and hashing only look at `(name, version)`; two records
/// with the same identity are the same package regardless of metadata.
#[derive(Debug, Clone)]
pub struct SourcePackage {
    id: PackageId,
    fields: Paragraph,
    mirror_root: Option<PathBuf>,
}

impl SourcePackage {
    /// Build a package from an index paragraph. Fails if `Package` or
    /// `Version` is missing.
    pub fn from_paragraph(fields: Paragraph, mirror_root: &Path) -> Result<Self> {
        let name = fields
            .get("Package")
            .ok_or_else(|| Error::ParseError("source paragraph without Package field".into()))?;
        let version = fields.get("Version").ok_or_else(|| {
            Error::ParseError(format!("source paragraph for {} without Version field", name))
        })?;

        Ok(Self {
            id: PackageId::new(name, version),
            fields,
            mirror_root: Some(mirror_root.to_path_buf()),
        })
    }

    /// Reconstruct a package from what the store knows about a version.
    ///
    /// Only identity and area survive; there is no mirror root, so
    /// `dsc_path` is unavailable.
    pub fn from_db_model(version: &Version) -> Self {
        let mut fields = Paragraph::new();
        fields.set("Package", version.name.as_str());
        fields.set("Version", version.vnumber.as_str());
        fields.set("Section", version.area.as_str());
        Self {
            id: PackageId::new(version.name.as_str(), version.vnumber.as_str()),
            fields,
            mirror_root: None,
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn version(&self) -> &str {
        &self.id.version
    }

    /// Raw access to any index field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    pub fn mirror_root(&self) -> Option<&Path> {
        self.mirror_root.as_deref()
    }

    /// Archive area, from the section prefix or, for old packages without a
    /// section, guessed from the pool directory
    pub fn archive_area(&self) -> Option<Area> {
        if let Some(section) = self.fields.get("Section") {
            return Some(if section.starts_with("contrib") {
                Area::Contrib
            } else if section.starts_with("non-free") {
                Area::NonFree
            } else {
                Area::Main
            });
        }

        let directory = self.fields.get("Directory")?;
        let steps: Vec<&str> = directory.split('/').collect();
        let area = if steps.contains(&"non-free") {
            Area::NonFree
        } else if steps.contains(&"contrib") {
            Area::Contrib
        } else {
            Area::Main
        };
        warn!("guessed archive area {} for package {}", area, self);
        Some(area)
    }

    pub fn prefix(&self) -> String {
        pkg_prefix(self.name())
    }

    /// Absolute path of the package's `.dsc` in the mirror
    pub fn dsc_path(&self) -> Result<PathBuf> {
        let listing = ["Checksums-Sha256", "Files"]
            .into_iter()
            .find(|field| self.fields.contains(field))
            .ok_or_else(|| {
                Error::ParseError(format!("cannot list components of source package {}", self))
            })?;

        let dsc = self
            .fields
            .lines(listing)
            .filter_map(|line| line.split_whitespace().last())
            .find(|name| name.ends_with(".dsc"))
            .ok_or_else(|| Error::ParseError(format!("no .dsc listed for {}", self)))?;

        let root = self.mirror_root.as_deref().ok_or_else(|| {
            Error::NotFoundError(format!("{} is not backed by a mirror", self))
        })?;
        let directory = self
            .fields
            .get("Directory")
            .ok_or_else(|| Error::ParseError(format!("no Directory field for {}", self)))?;

        Ok(root.join(directory).join(dsc))
    }

    /// `{basedir}/{area}/{prefix}/{name}/{version}`, or `None` if the area
    /// cannot be determined
    pub fn extraction_dir(&self, basedir: &Path) -> Option<PathBuf> {
        let area = self.archive_area()?;
        Some(
            basedir
                .join(area.as_str())
                .join(self.prefix())
                .join(self.name())
                .join(self.version()),
        )
    }

    /// First `Vcs-<type>` field with a known VCS type
    pub fn vcs(&self) -> Option<(VcsType, &str)> {
        VcsType::ALL.into_iter().find_map(|vcs| {
            self.fields
                .get(&format!("Vcs-{}", vcs.as_str()))
                .map(|url| (vcs, url))
        })
    }

    pub fn vcs_browser(&self) -> Option<&str> {
        self.fields.get("Vcs-Browser")
    }
}

impl PartialEq for SourcePackage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourcePackage {}

impl Hash for SourcePackage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for SourcePackage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourcePackage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for SourcePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::deb822::parse_str;
    use std::collections::HashSet;

    fn package(text: &str) -> SourcePackage {
        let paragraph = parse_str(text).unwrap().remove(0);
        SourcePackage::from_paragraph(paragraph, Path::new("/srv/mirror")).unwrap()
    }

    #[test]
    fn test_prefix() {
        assert_eq!(pkg_prefix("hello"), "h");
        assert_eq!(pkg_prefix("libcaca"), "libc");
        assert_eq!(pkg_prefix("lib"), "lib");
        assert_eq!(pkg_prefix("Xorg"), "x");
    }

    #[test]
    fn test_identity_ignores_metadata() {
        let a = package("Package: foo\nVersion: 1.0\nSection: devel\n");
        let b = package("Package: foo\nVersion: 1.0\nSection: contrib/devel\n");
        let c = package("Package: foo\nVersion: 1.1\n");

        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_archive_area() {
        assert_eq!(
            package("Package: a\nVersion: 1\nSection: non-free/net\n").archive_area(),
            Some(Area::NonFree)
        );
        assert_eq!(
            package("Package: a\nVersion: 1\nSection: contrib\n").archive_area(),
            Some(Area::Contrib)
        );
        assert_eq!(
            package("Package: a\nVersion: 1\nDirectory: pool/contrib/a/a\n").archive_area(),
            Some(Area::Contrib)
        );
        assert_eq!(package("Package: a\nVersion: 1\n").archive_area(), None);
    }

    #[test]
    fn test_dsc_and_extraction_paths() {
        let pkg = package(
            "Package: libfoo\nVersion: 1.0-1\nSection: libs\nDirectory: pool/main/libf/libfoo\n\
             Files:\n 0123 100 libfoo_1.0.orig.tar.gz\n 4567 20 libfoo_1.0-1.dsc\n",
        );
        assert_eq!(
            pkg.dsc_path().unwrap(),
            PathBuf::from("/srv/mirror/pool/main/libf/libfoo/libfoo_1.0-1.dsc")
        );
        assert_eq!(
            pkg.extraction_dir(Path::new("/srv/sources")).unwrap(),
            PathBuf::from("/srv/sources/main/libf/libfoo/1.0-1")
        );
    }

    #[test]
    fn test_missing_dsc() {
        let pkg = package("Package: a\nVersion: 1\nFiles:\n 0123 1 a.tar.gz\n");
        assert!(pkg.dsc_path().is_err());
    }

    #[test]
    fn test_vcs_fields() {
        let pkg = package(
            "Package: a\nVersion: 1\nVcs-Browser: https://salsa.example/a\nVcs-Git: https://salsa.example/a.git\n",
        );
        assert_eq!(pkg.vcs(), Some((VcsType::Git, "https://salsa.example/a.git")));
        assert_eq!(pkg.vcs_browser(), Some("https://salsa.example/a"));
    }

    #[test]
    fn test_from_db_model() {
        let mut version = Version::new(1, "foo".into(), "2.0".into(), Area::NonFree);
        version.id = Some(7);
        let pkg = SourcePackage::from_db_model(&version);

        assert_eq!(pkg.id(), &PackageId::new("foo", "2.0"));
        assert_eq!(pkg.archive_area(), Some(Area::NonFree));
        assert!(pkg.mirror_root().is_none());
    }
}
