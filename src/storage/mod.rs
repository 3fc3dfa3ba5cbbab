// src/storage/mod.rs

//! Filesystem store for extracted source packages
//!
//! Layout under the sources directory:
//!
//! ```text
//! {area}/{prefix}/{package}/{version}/            extracted tree
//! {area}/{prefix}/{package}/{version}.log         unpack tool output
//! {area}/{prefix}/{package}/{version}.done        successful extraction marker
//! {area}/{prefix}/{package}/{version}.<hook ext>  hook sidecar files
//! ```

mod unpack;

pub use unpack::{DpkgSource, Unpacker};

use crate::db::models::FileTable;
use crate::error::{Error, Result};
use crate::mirror::SourcePackage;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension of the unpack tool's log file
pub const LOG_EXT: &str = ".log";

/// Extension of the successful extraction marker
pub const DONE_EXT: &str = ".done";

/// `pkgdir` with `ext` appended to its last component, e.g.
/// `.../hello/2.8-2` + `.checksums` -> `.../hello/2.8-2.checksums`
pub fn sidecar_path(pkgdir: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(pkgdir.as_os_str());
    name.push(ext);
    PathBuf::from(name)
}

/// Whether a previous extraction of `pkgdir` completed
pub fn is_extracted(pkgdir: &Path) -> bool {
    sidecar_path(pkgdir, DONE_EXT).is_file()
}

/// Write a file through a `.new` temporary and rename it into place, so a
/// crash never leaves a half-written file under the final name.
///
/// The temporary is opened for reading too, so `write` may inspect what it
/// has written so far.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let temp_path = sidecar_path(path, ".new");
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)?;

    if let Err(e) = write(&mut file).and_then(|_| Ok(file.sync_all()?)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Extract `pkg` to `destdir`.
///
/// Any existing tree at `destdir` is removed first; a leftover from a failed
/// run is never reused. On success `{destdir}.done` is created. On failure
/// the error is returned and no marker exists.
pub fn extract_package(unpacker: &dyn Unpacker, pkg: &SourcePackage, destdir: &Path) -> Result<()> {
    debug!("extract {}...", pkg);

    let parent = destdir.parent().ok_or_else(|| {
        Error::IoError(format!("extraction dir {} has no parent", destdir.display()))
    })?;
    fs::create_dir_all(parent)?;

    let done = sidecar_path(destdir, DONE_EXT);
    if done.exists() {
        fs::remove_file(&done)?;
    }
    if destdir.is_dir() {
        fs::remove_dir_all(destdir)?;
    }

    let log = File::create(sidecar_path(destdir, LOG_EXT))?;
    unpacker.unpack(pkg, destdir, log)?;

    File::create(&done)?;
    Ok(())
}

/// Remove the tree at `destdir` together with its log and done marker, then
/// prune parent directories left empty
pub fn remove_package(pkg: &SourcePackage, destdir: &Path) -> Result<()> {
    debug!("remove {} from {}", pkg, destdir.display());

    if destdir.is_dir() {
        fs::remove_dir_all(destdir)?;
    }
    for ext in [LOG_EXT, DONE_EXT] {
        let path = sidecar_path(destdir, ext);
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }

    // {package}, {prefix} and {area}; stops at the first non-empty one
    for dir in destdir.ancestors().skip(1).take(3) {
        if fs::remove_dir(dir).is_err() {
            break;
        }
    }
    Ok(())
}

/// Enumerate `(relative, absolute)` paths of the files in `pkgdir`.
///
/// With a file table from an earlier step the filesystem is not walked again.
pub fn walk_pkg_files(pkgdir: &Path, file_table: Option<&FileTable>) -> Result<Vec<(PathBuf, PathBuf)>> {
    if let Some(table) = file_table {
        return Ok(table
            .keys()
            .map(|rel| (rel.clone(), pkgdir.join(rel)))
            .collect());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(pkgdir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let abspath = entry.into_path();
        let relpath = abspath
            .strip_prefix(pkgdir)
            .map_err(|e| Error::IoError(format!("{}: {}", abspath.display(), e)))?
            .to_path_buf();
        files.push((relpath, abspath));
    }
    Ok(files)
}

/// Iterate over `{area}/{prefix}/{package}/*` entries: package directories
/// and their sidecar files
pub fn walk(sources_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(sources_dir)
        .min_depth(4)
        .max_depth(4)
        .sort_by_file_name()
    {
        entries.push(entry?.into_path());
    }
    Ok(entries)
}

/// A path inside the store, split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    pub package: String,
    pub version: String,
    /// Sidecar extension including the dot, `None` for package directories
    pub ext: Option<String>,
}

/// Parse a path returned by [`walk`]
pub fn parse_path(path: &Path) -> Result<StoragePath> {
    let component = |p: Option<&std::ffi::OsStr>| {
        p.map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::ParseError(format!("not a storage path: {}", path.display())))
    };
    let package = component(path.parent().and_then(Path::file_name))?;
    let last = component(path.file_name())?;

    if path.is_dir() {
        return Ok(StoragePath {
            package,
            version: last,
            ext: None,
        });
    }
    if !path.is_file() {
        return Err(Error::ParseError(format!(
            "not a file or directory: {}",
            path.display()
        )));
    }

    let (version, ext) = last.rsplit_once('.').ok_or_else(|| {
        Error::ParseError(format!("sidecar without extension: {}", path.display()))
    })?;
    Ok(StoragePath {
        package,
        version: version.to_string(),
        ext: Some(format!(".{}", ext)),
    })
}

/// Remove one file from an extracted package
pub fn rm_file(pkgdir: &Path, relpath: &Path) -> Result<()> {
    let path = pkgdir.join(relpath);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("cannot remove non existing file {}", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `content` to `path` atomically
pub fn write_file_atomically(path: &Path, content: &[u8]) -> Result<()> {
    write_atomically(path, |f| Ok(f.write_all(content)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::deb822::parse_str;
    use tempfile::TempDir;

    struct TouchUnpacker;

    impl Unpacker for TouchUnpacker {
        fn name(&self) -> &str {
            "touch"
        }

        fn unpack(&self, _pkg: &SourcePackage, destdir: &Path, mut log: File) -> Result<()> {
            fs::create_dir_all(destdir.join("src"))?;
            fs::write(destdir.join("src/main.c"), "int main;")?;
            fs::write(destdir.join("README"), "hi")?;
            writeln!(log, "unpacked")?;
            Ok(())
        }
    }

    struct FailingUnpacker;

    impl Unpacker for FailingUnpacker {
        fn name(&self) -> &str {
            "fail"
        }

        fn unpack(&self, _pkg: &SourcePackage, destdir: &Path, _log: File) -> Result<()> {
            fs::create_dir_all(destdir)?;
            Err(Error::command("fail", "exit status: 2"))
        }
    }

    fn package() -> SourcePackage {
        let p = parse_str("Package: hello\nVersion: 1.0\nSection: misc\n").unwrap();
        SourcePackage::from_paragraph(p.into_iter().next().unwrap(), Path::new("/nonexistent"))
            .unwrap()
    }

    #[test]
    fn test_extract_and_remove() {
        let dir = TempDir::new().unwrap();
        let pkg = package();
        let destdir = pkg.extraction_dir(dir.path()).unwrap();

        extract_package(&TouchUnpacker, &pkg, &destdir).unwrap();
        assert!(is_extracted(&destdir));
        assert!(sidecar_path(&destdir, LOG_EXT).is_file());

        let files = walk_pkg_files(&destdir, None).unwrap();
        let rel: Vec<_> = files.iter().map(|(r, _)| r.clone()).collect();
        assert_eq!(rel, vec![PathBuf::from("README"), PathBuf::from("src/main.c")]);

        remove_package(&pkg, &destdir).unwrap();
        assert!(!destdir.exists());
        assert!(!is_extracted(&destdir));
        // empty parents pruned, the sources dir itself is kept
        assert!(!dir.path().join("main").exists());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_remove_keeps_sibling_versions() {
        let dir = TempDir::new().unwrap();
        let pkg = package();
        let destdir = pkg.extraction_dir(dir.path()).unwrap();
        let sibling = destdir.with_file_name("2.0");
        fs::create_dir_all(&sibling).unwrap();

        extract_package(&TouchUnpacker, &pkg, &destdir).unwrap();
        remove_package(&pkg, &destdir).unwrap();
        assert!(sibling.is_dir());
    }

    #[test]
    fn test_failed_extraction_leaves_no_marker() {
        let dir = TempDir::new().unwrap();
        let pkg = package();
        let destdir = pkg.extraction_dir(dir.path()).unwrap();

        extract_package(&TouchUnpacker, &pkg, &destdir).unwrap();
        fs::write(destdir.join("stale"), "x").unwrap();

        assert!(extract_package(&FailingUnpacker, &pkg, &destdir).is_err());
        assert!(!is_extracted(&destdir));
        assert!(!destdir.join("stale").exists());
    }

    #[test]
    fn test_walk_pkg_files_uses_file_table() {
        let mut table = FileTable::new();
        table.insert(PathBuf::from("only/this"), 1);
        let files = walk_pkg_files(Path::new("/does/not/exist"), Some(&table)).unwrap();
        assert_eq!(
            files,
            vec![(PathBuf::from("only/this"), PathBuf::from("/does/not/exist/only/this"))]
        );
    }

    #[test]
    fn test_walk_and_parse_path() {
        let dir = TempDir::new().unwrap();
        let pkg = package();
        let destdir = pkg.extraction_dir(dir.path()).unwrap();
        extract_package(&TouchUnpacker, &pkg, &destdir).unwrap();
        fs::write(sidecar_path(&destdir, ".checksums"), "").unwrap();

        let parsed: Vec<StoragePath> = walk(dir.path())
            .unwrap()
            .iter()
            .map(|p| parse_path(p).unwrap())
            .collect();

        assert!(parsed.contains(&StoragePath {
            package: "hello".into(),
            version: "1.0".into(),
            ext: None,
        }));
        assert!(parsed.contains(&StoragePath {
            package: "hello".into(),
            version: "1.0".into(),
            ext: Some(".checksums".into()),
        }));
    }

    #[test]
    fn test_write_atomically_cleans_up_on_error() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.checksums");

        let result = write_atomically(&target, |f| {
            f.write_all(b"partial")?;
            Err(Error::ParseError("boom".into()))
        });
        assert!(result.is_err());
        assert!(!target.exists());
        assert!(!sidecar_path(&target, ".new").exists());

        write_file_atomically(&target, b"done").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"done");
    }

    #[test]
    fn test_write_atomically_reads_back() {
        use std::io::{Read, Seek, SeekFrom};

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.sloccount");

        write_atomically(&target, |f| {
            f.write_all(b"SLOC total is zero\n")?;
            let mut text = String::new();
            f.seek(SeekFrom::Start(0))?;
            f.read_to_string(&mut text)?;
            assert_eq!(text, "SLOC total is zero\n");
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"SLOC total is zero\n");
    }

    #[test]
    fn test_rm_file_missing_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.jar"), "x").unwrap();
        rm_file(dir.path(), Path::new("a.jar")).unwrap();
        rm_file(dir.path(), Path::new("a.jar")).unwrap();
        assert!(!dir.path().join("a.jar").exists());
    }
}
