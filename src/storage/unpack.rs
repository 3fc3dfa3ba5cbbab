// src/storage/unpack.rs

//! Unpacking a source package into its extraction directory

use crate::error::{Error, Result};
use crate::mirror::SourcePackage;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Turns a mirrored source package into an unpacked tree at `destdir`.
///
/// `log` receives the tool's combined output. `destdir` does not exist when
/// this is called; its parent does.
pub trait Unpacker: Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;

    fn unpack(&self, pkg: &SourcePackage, destdir: &Path, log: File) -> Result<()>;
}

/// Unpacks with `dpkg-source -x`
#[derive(Debug, Clone)]
pub struct DpkgSource {
    program: String,
}

impl DpkgSource {
    pub fn new() -> Self {
        Self {
            program: "dpkg-source".to_string(),
        }
    }

    /// Use a different executable, e.g. a wrapper script
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DpkgSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Unpacker for DpkgSource {
    fn name(&self) -> &str {
        &self.program
    }

    fn unpack(&self, pkg: &SourcePackage, destdir: &Path, log: File) -> Result<()> {
        let dsc = pkg.dsc_path()?;
        debug!("{} -x {} {}", self.program, dsc.display(), destdir.display());

        let stderr = log.try_clone()?;
        let status = Command::new(&self.program)
            .args(["--no-copy", "--no-check", "-x"])
            .arg(&dsc)
            .arg(destdir)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(stderr)
            .status()
            .map_err(|e| Error::command(&self.program, format!("failed to spawn: {}", e)))?;

        if !status.success() {
            return Err(Error::command(
                &self.program,
                format!("extraction of {} exited with {}", pkg, status),
            ));
        }
        Ok(())
    }
}
