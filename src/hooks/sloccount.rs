// src/hooks/sloccount.rs

//! Physical source lines per language, as counted by David A. Wheeler's
//! `sloccount`
//!
//! The sidecar holds the tool's full report. Only the "Totals grouped by
//! language" table is stored in the database.

use super::{Hook, HookContext, Registrar, remove_sidecar};
use crate::db::models::SlocCount;
use crate::error::{Error, Result};
use crate::storage::write_atomically;
use regex::Regex;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use tracing::debug;

pub const SLOCCOUNT_EXT: &str = ".sloccount";

/// Also count languages sloccount is not sure about
const SLOCCOUNT_FLAGS: [&str; 1] = ["--addlangall"];

/// Prefix of the report line for trees without any recognized source
const EMPTY_REPORT_MARKER: &str = "SLOC total is zero,";

static TABLE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Totals grouped by language").unwrap());
static TABLE_FOOTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*$").unwrap());
static TABLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<lang>[^:]+):\s+(?P<locs>\d+)").unwrap());

/// Built-in `sloccount` hook
pub struct SloccountHook {
    program: String,
}

impl SloccountHook {
    pub fn new() -> Self {
        Self {
            program: "sloccount".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run_sloccount(&self, ctx: &HookContext<'_>, out: &mut fs::File) -> Result<()> {
        debug!("{} on {}", self.program, ctx.pkgdir.display());
        let status = Command::new(&self.program)
            .args(SLOCCOUNT_FLAGS)
            .arg(ctx.pkgdir)
            .stdin(Stdio::null())
            .stdout(out.try_clone()?)
            .stderr(out.try_clone()?)
            .status()
            .map_err(|e| Error::command(&self.program, format!("failed to spawn: {}", e)))?;

        if status.success() {
            return Ok(());
        }

        // exits non-zero when there is nothing to count
        let mut report = String::new();
        out.seek(SeekFrom::Start(0))?;
        out.read_to_string(&mut report)?;
        out.seek(SeekFrom::End(0))?;
        if report.lines().any(|l| l.starts_with(EMPTY_REPORT_MARKER)) {
            debug!("no source code found in {}", ctx.pkg);
            return Ok(());
        }

        Err(Error::command(
            &self.program,
            format!("counting {} exited with {}", ctx.pkg, status),
        ))
    }
}

impl Default for SloccountHook {
    fn default() -> Self {
        Self::new()
    }
}

impl Hook for SloccountHook {
    fn name(&self) -> &'static str {
        "sloccount"
    }

    fn init(&self, registrar: &mut Registrar<'_>) -> Result<()> {
        registrar.subscribe("add-package")?;
        registrar.subscribe("rm-package")?;
        registrar.declare_extension(SLOCCOUNT_EXT, self.name())
    }

    fn add_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        let sidecar = ctx.sidecar(SLOCCOUNT_EXT);

        if ctx.fs_enabled() && !sidecar.exists() {
            write_atomically(&sidecar, |out| self.run_sloccount(ctx, out))?;
        }

        if ctx.db_enabled() {
            let version_id = ctx.version_id()?;
            if SlocCount::exists_for_version(ctx.conn, version_id)? {
                return Ok(());
            }

            let report = String::from_utf8_lossy(&fs::read(&sidecar)?).into_owned();
            let rows: Vec<SlocCount> = parse_sloccount(&report)
                .into_iter()
                .map(|(language, count)| SlocCount::new(version_id, language, count))
                .collect();
            SlocCount::insert_all(ctx.conn, &rows)?;
        }
        Ok(())
    }

    fn rm_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        if ctx.fs_enabled() {
            remove_sidecar(&ctx.sidecar(SLOCCOUNT_EXT))?;
        }
        if ctx.db_enabled() {
            SlocCount::delete_by_version(ctx.conn, ctx.version_id()?)?;
        }
        Ok(())
    }
}

/// Extract `(language, lines)` pairs from a sloccount report.
///
/// A report without the totals table yields nothing.
pub fn parse_sloccount(report: &str) -> Vec<(String, i64)> {
    let mut counts = Vec::new();
    let mut in_table = false;

    for line in report.lines() {
        if !in_table {
            in_table = TABLE_HEADER.is_match(line);
            continue;
        }
        if TABLE_FOOTER.is_match(line) {
            break;
        }
        if let Some(caps) = TABLE_LINE.captures(line)
            && let Ok(count) = caps["locs"].parse::<i64>()
        {
            counts.push((caps["lang"].trim().to_string(), count));
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::HookFixture;
    use std::path::PathBuf;

    const REPORT: &str = "\
Creating filelist for src
Categorizing files.
Computing results.


SLOC\tDirectory\tSLOC-by-Language (Sorted)
1250    src             ansic=1200,sh=50


Totals grouped by language (dominant language first):
ansic:         1200 (96.00%)
sh:              50 (4.00%)




Total Physical Source Lines of Code (SLOC)                = 1,250
";

    #[test]
    fn test_parse_report() {
        assert_eq!(
            parse_sloccount(REPORT),
            vec![("ansic".to_string(), 1200), ("sh".to_string(), 50)]
        );
    }

    #[test]
    fn test_empty_report() {
        let report = "SLOC total is zero, no further analysis performed.\n";
        assert!(parse_sloccount(report).is_empty());
    }

    const FILES: &[(&str, &str)] = &[("src/hello.c", "int main(void) { return 0; }\n")];

    fn counts(fixture: &HookFixture) -> Vec<(String, i64)> {
        SlocCount::find_by_version(&fixture.conn, fixture.version_id)
            .unwrap()
            .into_iter()
            .map(|c| (c.language, c.count))
            .collect()
    }

    /// Script that records its arguments and prints `REPORT`
    fn fake_sloccount(fixture: &HookFixture) -> (String, PathBuf) {
        let argv = fixture.dir.path().join("argv");
        let body = format!(
            "printf '%s\\n' \"$@\" > '{}'\ncat <<'EOF'\n{}EOF\n",
            argv.display(),
            REPORT
        );
        (fixture.script("sloccount", &body), argv)
    }

    #[test]
    fn test_add_and_remove_package() {
        let fixture = HookFixture::new(FILES);
        let (program, argv) = fake_sloccount(&fixture);
        let hook = SloccountHook::with_program(program);

        hook.add_package(&fixture.ctx()).unwrap();

        assert_eq!(
            fs::read_to_string(&argv).unwrap(),
            format!("--addlangall\n{}\n", fixture.pkgdir.display())
        );
        let sidecar = fixture.sidecar(SLOCCOUNT_EXT);
        assert!(fs::read_to_string(&sidecar).unwrap().contains("Totals grouped by language"));
        assert_eq!(
            counts(&fixture),
            vec![("ansic".to_string(), 1200), ("sh".to_string(), 50)]
        );

        hook.rm_package(&fixture.ctx()).unwrap();
        assert!(!sidecar.exists());
        assert!(counts(&fixture).is_empty());
    }

    #[test]
    fn test_nothing_to_count_is_not_a_failure() {
        let fixture = HookFixture::new(FILES);
        let program = fixture.script(
            "sloccount",
            "echo 'SLOC total is zero, no further analysis performed.'\nexit 1\n",
        );

        SloccountHook::with_program(program)
            .add_package(&fixture.ctx())
            .unwrap();

        assert!(fixture.sidecar(SLOCCOUNT_EXT).is_file());
        assert!(counts(&fixture).is_empty());
    }

    #[test]
    fn test_tool_failure() {
        let fixture = HookFixture::new(FILES);

        let program = fixture.script("sloccount", "echo 'cannot read input' >&2\nexit 2\n");
        let err = SloccountHook::with_program(program)
            .add_package(&fixture.ctx())
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));

        let err = SloccountHook::with_program(fixture.missing_program())
            .add_package(&fixture.ctx())
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));

        assert!(!fixture.sidecar(SLOCCOUNT_EXT).exists());
        assert!(counts(&fixture).is_empty());
    }

    #[test]
    fn test_existing_sidecar_is_reused() {
        let fixture = HookFixture::new(FILES);
        fs::write(fixture.sidecar(SLOCCOUNT_EXT), REPORT).unwrap();

        SloccountHook::with_program(fixture.missing_program())
            .add_package(&fixture.ctx())
            .unwrap();

        assert_eq!(counts(&fixture).len(), 2);
    }

    #[test]
    fn test_existing_rows_are_kept() {
        let fixture = HookFixture::new(FILES);
        fs::write(fixture.sidecar(SLOCCOUNT_EXT), REPORT).unwrap();
        SlocCount::insert_all(
            &fixture.conn,
            &[SlocCount::new(fixture.version_id, "python".to_string(), 3)],
        )
        .unwrap();

        SloccountHook::with_program(fixture.missing_program())
            .add_package(&fixture.ctx())
            .unwrap();

        assert_eq!(counts(&fixture), vec![("python".to_string(), 3)]);
    }
}
