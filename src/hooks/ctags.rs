// src/hooks/ctags.rs

//! Symbol definitions extracted with Exuberant/Universal Ctags
//!
//! The sidecar is the raw ctags output in its extended tab-separated format:
//! `tag<TAB>path<TAB>excmd;"<TAB>key:value...`, with `!_TAG` header lines.

use super::{Hook, HookContext, Registrar, remove_sidecar};
use crate::db::models::Ctag;
use crate::error::{Error, Result};
use crate::storage::write_atomically;
use std::ffi::OsStr;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub const CTAGS_EXT: &str = ".ctags";

/// Longest tag accepted, in bytes
pub const MAX_KEY_LENGTH: usize = 8000;

/// Malformed tags reported individually before switching to a summary
const MAX_MALFORMED_WARNINGS: usize = 5;

const CTAGS_FLAGS: [&str; 5] = [
    "--recurse",
    "--excmd=number",
    "--fields=+lnz",
    "--sort=no",
    "--links=no",
];

/// One parsed tag record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub tag: String,
    /// Path relative to the package directory
    pub path: PathBuf,
    pub line: i64,
    pub kind: Option<String>,
    /// Lowercased language name
    pub language: Option<String>,
}

/// Built-in `ctags` hook
pub struct CtagsHook {
    program: String,
}

impl CtagsHook {
    pub fn new() -> Self {
        Self {
            program: "ctags".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run_ctags(&self, ctx: &HookContext<'_>, out: &fs::File) -> Result<()> {
        debug!("{} on {}", self.program, ctx.pkgdir.display());
        let status = Command::new(&self.program)
            .args(CTAGS_FLAGS)
            .args(["-f", "-"])
            .current_dir(ctx.pkgdir)
            .stdin(Stdio::null())
            .stdout(out.try_clone()?)
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::command(&self.program, format!("failed to spawn: {}", e)))?;

        if !status.success() {
            return Err(Error::command(
                &self.program,
                format!("tagging {} exited with {}", ctx.pkg, status),
            ));
        }
        Ok(())
    }
}

impl Default for CtagsHook {
    fn default() -> Self {
        Self::new()
    }
}

impl Hook for CtagsHook {
    fn name(&self) -> &'static str {
        "ctags"
    }

    fn init(&self, registrar: &mut Registrar<'_>) -> Result<()> {
        registrar.subscribe("add-package")?;
        registrar.subscribe("rm-package")?;
        registrar.declare_extension(CTAGS_EXT, self.name())
    }

    fn add_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        let sidecar = ctx.sidecar(CTAGS_EXT);

        if ctx.fs_enabled() && !sidecar.exists() {
            write_atomically(&sidecar, |out| self.run_ctags(ctx, out))?;
        }

        if ctx.db_enabled() {
            let version_id = ctx.version_id()?;
            if Ctag::exists_for_version(ctx.conn, version_id)? {
                return Ok(());
            }

            let mut rows = Vec::new();
            for parsed in parse_ctags(fs::File::open(&sidecar)?)? {
                // ctags may descend into paths the file table does not
                // know about, e.g. below excluded files
                let Some(&file_id) = ctx.file_table.get(&parsed.path) else {
                    continue;
                };
                rows.push(Ctag {
                    id: None,
                    version_id,
                    file_id,
                    tag: parsed.tag,
                    line: parsed.line,
                    kind: parsed.kind,
                    language: parsed.language,
                });
            }
            let inserted = Ctag::insert_all(ctx.conn, &rows)?;
            debug!("{} tags recorded for {}", inserted, ctx.pkg);
        }
        Ok(())
    }

    fn rm_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        if ctx.fs_enabled() {
            remove_sidecar(&ctx.sidecar(CTAGS_EXT))?;
        }
        if ctx.db_enabled() {
            Ctag::delete_by_version(ctx.conn, ctx.version_id()?)?;
        }
        Ok(())
    }
}

fn parse_tag(line: &[u8]) -> std::result::Result<ParsedTag, &'static str> {
    let mut fields = line.split(|&b| b == b'\t');
    let tag = fields.next().filter(|t| !t.is_empty()).ok_or("empty tag")?;
    if tag.len() > MAX_KEY_LENGTH {
        return Err("tag too long");
    }
    let path = fields.next().filter(|p| !p.is_empty()).ok_or("missing path")?;
    fields.next().ok_or("missing ex command")?;

    let mut line_no = None;
    let mut kind = None;
    let mut language = None;
    for ext in fields {
        let ext = String::from_utf8_lossy(ext);
        let Some((key, value)) = ext.split_once(':') else {
            continue;
        };
        match key {
            "kind" => kind = Some(value.to_string()),
            "line" => line_no = Some(value.parse::<i64>().map_err(|_| "bad line number")?),
            "language" => language = Some(value.to_lowercase()),
            _ => {}
        }
    }

    Ok(ParsedTag {
        tag: String::from_utf8_lossy(tag).into_owned(),
        path: PathBuf::from(OsStr::from_bytes(path)),
        line: line_no.ok_or("missing line number")?,
        kind,
        language,
    })
}

/// Parse ctags output. Malformed records are logged and dropped.
pub fn parse_ctags<R: Read>(reader: R) -> Result<Vec<ParsedTag>> {
    let mut tags = Vec::new();
    let mut malformed = 0usize;

    for line in BufReader::new(reader).split(b'\n') {
        let line = line?;
        if line.is_empty() || line.starts_with(b"!_TAG") {
            continue;
        }
        match parse_tag(&line) {
            Ok(tag) => tags.push(tag),
            Err(reason) => {
                malformed += 1;
                if malformed <= MAX_MALFORMED_WARNINGS {
                    warn!(
                        "ignoring malformed tag ({}): {}",
                        reason,
                        String::from_utf8_lossy(&line)
                    );
                }
            }
        }
    }

    if malformed > MAX_MALFORMED_WARNINGS {
        warn!(
            "{} extra malformed tag(s) ignored",
            malformed - MAX_MALFORMED_WARNINGS
        );
    }
    Ok(tags)
}
