// src/hooks/metrics.rs

//! Disk usage of an extracted package, measured with `du`
//!
//! Sidecar: a `.stats` file of `name<TAB>value` lines; currently only `size`.

use super::{Hook, HookContext, Registrar, remove_sidecar};
use crate::db::models::Metric;
use crate::error::{Error, Result};
use crate::storage::write_file_atomically;
use std::fs;
use std::process::{Command, Stdio};
use tracing::debug;

pub const STATS_EXT: &str = ".stats";

/// Metric name for the on-disk size, in `du` blocks
pub const SIZE_METRIC: &str = "size";

/// Built-in `metrics` hook
pub struct MetricsHook {
    program: String,
}

impl MetricsHook {
    pub fn new() -> Self {
        Self {
            program: "du".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn disk_usage(&self, ctx: &HookContext<'_>) -> Result<i64> {
        let output = Command::new(&self.program)
            .arg("--summarize")
            .arg(ctx.pkgdir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::command(&self.program, format!("failed to spawn: {}", e)))?;

        if !output.status.success() {
            return Err(Error::command(
                &self.program,
                format!(
                    "measuring {} exited with {}: {}",
                    ctx.pkg,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        parse_du_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for MetricsHook {
    fn default() -> Self {
        Self::new()
    }
}

impl Hook for MetricsHook {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn init(&self, registrar: &mut Registrar<'_>) -> Result<()> {
        registrar.subscribe("add-package")?;
        registrar.subscribe("rm-package")?;
        registrar.declare_extension(STATS_EXT, self.name())
    }

    fn add_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        let sidecar = ctx.sidecar(STATS_EXT);

        if ctx.fs_enabled() && !sidecar.exists() {
            let size = self.disk_usage(ctx)?;
            write_file_atomically(&sidecar, format!("{}\t{}\n", SIZE_METRIC, size).as_bytes())?;
        }

        if ctx.db_enabled() {
            let version_id = ctx.version_id()?;
            if Metric::find(ctx.conn, version_id, SIZE_METRIC)?.is_some() {
                return Ok(());
            }

            let stats = fs::read_to_string(&sidecar)?;
            let size = parse_stats(&stats, SIZE_METRIC).ok_or_else(|| {
                Error::ParseError(format!("no {} in {}", SIZE_METRIC, sidecar.display()))
            })?;
            Metric::new(version_id, SIZE_METRIC.to_string(), size).insert(ctx.conn)?;
            debug!("{} {} = {}", ctx.pkg, SIZE_METRIC, size);
        }
        Ok(())
    }

    fn rm_package(&self, ctx: &HookContext<'_>) -> Result<()> {
        if ctx.fs_enabled() {
            remove_sidecar(&ctx.sidecar(STATS_EXT))?;
        }
        if ctx.db_enabled() {
            Metric::delete(ctx.conn, ctx.version_id()?, SIZE_METRIC)?;
        }
        Ok(())
    }
}

/// First field of `du --summarize` output
pub fn parse_du_output(output: &str) -> Result<i64> {
    output
        .split_whitespace()
        .next()
        .and_then(|size| size.parse().ok())
        .ok_or_else(|| Error::ParseError(format!("unexpected du output: {:?}", output)))
}

fn parse_stats(text: &str, metric: &str) -> Option<i64> {
    text.lines()
        .filter_map(|line| line.split_once('\t'))
        .find(|(name, _)| *name == metric)
        .and_then(|(_, value)| value.trim().parse().ok())
}
