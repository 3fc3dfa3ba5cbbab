// src/hooks/checksums.rs

//! SHA-256 of every regular file in an extracted package
//!
//! Sidecar format, one line per file:
//!
//! ```text
//! <64 hex chars>  <path relative to the package directory>
//! ```

use super::{Hook, HookContext, Registrar, remove_sidecar};
use crate::db::models::Checksum;
use crate::error::{Error, Result};
use crate::hash::{SHA256_HEX_LEN, is_sha256_hex, sha256_file};
use crate::storage::{walk_pkg_files, write_atomically};
use std::ffi::OsStr;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CHECKSUMS_EXT: &str = ".checksums";

/// Built-in `checksums` hook
pub struct ChecksumsHook;

impl Hook for ChecksumsHook {
    fn name(&self) -> &'static str {
        "checksums"
    }

    fn init(&self, registrar: &mut Registrar<'_>) -> Result<()> {
        registrar.subscribe("add-package")?;
        registrar.subscribe("rm-package")?;
        registrar.declare_extension(CHECKSUMS_EXT, self.name())
    }

    fn add_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        let sidecar = ctx.sidecar(CHECKSUMS_EXT);

        if ctx.fs_enabled() && !sidecar.exists() {
            let table = (!ctx.file_table.is_empty()).then_some(ctx.file_table);
            let files = walk_pkg_files(ctx.pkgdir, table)?;
            write_atomically(&sidecar, |out| write_checksums(out, &files))?;
        }

        if ctx.db_enabled() {
            let version_id = ctx.version_id()?;
            if Checksum::exists_for_version(ctx.conn, version_id)? {
                return Ok(());
            }

            let entries = parse_checksums(fs::File::open(&sidecar)?)?;
            let mut rows = Vec::with_capacity(entries.len());
            for (sha256, relpath) in entries {
                match ctx.file_table.get(&relpath) {
                    Some(&file_id) => rows.push(Checksum::new(version_id, file_id, sha256)),
                    None => warn!(
                        "checksum for {} in {} has no file row, skipping",
                        relpath.display(),
                        ctx.pkg
                    ),
                }
            }
            let inserted = Checksum::insert_all(ctx.conn, &rows)?;
            debug!("{} checksums recorded for {}", inserted, ctx.pkg);
        }
        Ok(())
    }

    fn rm_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        if ctx.fs_enabled() {
            remove_sidecar(&ctx.sidecar(CHECKSUMS_EXT))?;
        }
        if ctx.db_enabled() {
            Checksum::delete_by_version(ctx.conn, ctx.version_id()?)?;
        }
        Ok(())
    }
}

fn write_checksums<W: Write>(out: &mut W, files: &[(PathBuf, PathBuf)]) -> Result<()> {
    for (relpath, abspath) in files {
        // symlinks and special files carry no content of their own
        let meta = fs::symlink_metadata(abspath)?;
        if !meta.file_type().is_file() {
            continue;
        }
        let sha256 = sha256_file(abspath)?;
        out.write_all(sha256.as_bytes())?;
        out.write_all(b"  ")?;
        out.write_all(relpath.as_os_str().as_bytes())?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Parse a `.checksums` sidecar into `(sha256, relative path)` pairs.
///
/// Paths are raw bytes; they are not required to be UTF-8.
pub fn parse_checksums<R: Read>(reader: R) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for line in BufReader::new(reader).split(b'\n') {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let sha256 = line
            .get(..SHA256_HEX_LEN)
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .filter(|hex| is_sha256_hex(hex));
        let path = line.get(SHA256_HEX_LEN + 2..).filter(|p| !p.is_empty());

        match (sha256, path) {
            (Some(sha256), Some(path)) => entries.push((
                sha256.to_string(),
                Path::new(OsStr::from_bytes(path)).to_path_buf(),
            )),
            _ => {
                return Err(Error::ParseError(format!(
                    "malformed checksums line: {}",
                    String::from_utf8_lossy(&line)
                )));
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_write_skips_symlinks() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.c"), b"int main;\n").unwrap();
        symlink("a.c", dir.path().join("link.c")).unwrap();

        let files = walk_pkg_files(dir.path(), None).unwrap();
        let mut out = Vec::new();
        write_checksums(&mut out, &files).unwrap();

        let entries = parse_checksums(out.as_slice()).unwrap();
        assert_eq!(
            entries,
            vec![(sha256(b"int main;\n"), PathBuf::from("a.c"))]
        );
    }

    #[test]
    fn test_parse_keeps_spaces_and_raw_bytes() {
        let sha = "a".repeat(64);
        let mut text = format!("{}  dir/with space.txt\n", sha).into_bytes();
        text.extend_from_slice(sha.as_bytes());
        text.extend_from_slice(b"  latin1-\xe9.txt\n");

        let entries = parse_checksums(text.as_slice()).unwrap();
        assert_eq!(entries[0].1, PathBuf::from("dir/with space.txt"));
        assert_eq!(entries[1].1.as_os_str().as_bytes(), b"latin1-\xe9.txt");
    }

    #[test]
    fn test_parse_rejects_short_line() {
        assert!(parse_checksums(b"deadbeef  x\n".as_slice()).is_err());
    }
}
