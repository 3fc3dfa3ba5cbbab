// src/config.rs

//! Synchronizer configuration
//!
//! Loaded from a TOML file; every key is optional. Command-line flags are
//! applied on top by the binary.
//!
//! ```toml
//! mirror_dir = "/srv/srcmirror/mirror"
//! sources_dir = "/srv/srcmirror/sources"
//! passes = ["db", "fs", "hooks", "hooks.db", "hooks.fs"]
//! hooks = ["checksums", "ctags", "metrics", "sloccount"]
//! force_triggers = ["add-package/checksums"]
//! expire_days = 7
//! ```

use crate::error::{Error, Result};
use crate::hooks::HookEvent;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/srcmirror/config.toml";

/// Default database location
pub const DEFAULT_DB_PATH: &str = "/var/lib/srcmirror/srcmirror.db";

/// A category of work that can be switched on or off for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum Pass {
    #[serde(rename = "db")]
    Db,
    #[serde(rename = "fs")]
    Fs,
    /// Notify hooks at all
    #[serde(rename = "hooks")]
    Hooks,
    /// Let hooks write database rows
    #[serde(rename = "hooks.db")]
    HooksDb,
    /// Let hooks write sidecar files
    #[serde(rename = "hooks.fs")]
    HooksFs,
}

impl Pass {
    pub const ALL: [Pass; 5] = [Pass::Db, Pass::Fs, Pass::Hooks, Pass::HooksDb, Pass::HooksFs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pass::Db => "db",
            Pass::Fs => "fs",
            Pass::Hooks => "hooks",
            Pass::HooksDb => "hooks.db",
            Pass::HooksFs => "hooks.fs",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Pass::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown pass: {}", s)))
    }
}

/// Set of enabled passes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Passes(BTreeSet<Pass>);

impl Passes {
    pub fn all() -> Self {
        Self(Pass::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, pass: Pass) -> bool {
        self.0.contains(&pass)
    }

    /// Parse command-line values; `none` disables every pass
    pub fn parse_list<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        if values.iter().any(|v| v.as_ref() == "none") {
            return Ok(Self::none());
        }
        values
            .iter()
            .map(|v| v.as_ref().parse())
            .collect::<Result<BTreeSet<_>>>()
            .map(Self)
    }
}

impl Default for Passes {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Pass> for Passes {
    fn from_iter<I: IntoIterator<Item = Pass>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Passes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Pass::as_str).collect();
        write!(f, "{}", names.join(" "))
    }
}

/// Phase of an update run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Add packages new in the mirror
    Extract,
    /// Rebuild live suite mappings
    Suites,
    /// Remove packages gone from the mirror
    Gc,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Extract, Stage::Suites, Stage::Gc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Suites => "suites",
            Stage::Gc => "gc",
        }
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown stage: {}", s)))
    }
}

fn all_stages() -> BTreeSet<Stage> {
    Stage::ALL.into_iter().collect()
}

/// A hook callback to re-run for every package, written `event/hook`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ForcedTrigger {
    pub event: HookEvent,
    pub hook: String,
}

impl FromStr for ForcedTrigger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (event, hook) = s
            .split_once('/')
            .filter(|(_, hook)| !hook.is_empty())
            .ok_or_else(|| Error::Config(format!("trigger must be EVENT/HOOK, got {:?}", s)))?;
        Ok(Self {
            event: event.parse()?,
            hook: hook.to_string(),
        })
    }
}

impl TryFrom<String> for ForcedTrigger {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for ForcedTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event, self.hook)
    }
}

fn default_hooks() -> Vec<String> {
    ["checksums", "ctags", "metrics", "sloccount"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration of an update or archive run
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Root of the local Debian source mirror
    pub mirror_dir: PathBuf,
    /// Mirror holding archived releases for sticky suites; defaults to
    /// `mirror_dir`
    pub archive_dir: Option<PathBuf>,
    /// Root of the extracted sources store
    pub sources_dir: PathBuf,
    /// Directory for generated listings such as `sources.txt`
    pub cache_dir: PathBuf,
    pub db_path: PathBuf,
    /// Compute what would change without touching either store
    pub dry_run: bool,
    pub passes: Passes,
    pub stages: BTreeSet<Stage>,
    /// Hold the whole run in one database transaction instead of
    /// committing after every package
    pub single_transaction: bool,
    /// Minimum age, in days, of an extraction before it is garbage collected
    pub expire_days: u32,
    pub force_triggers: Vec<ForcedTrigger>,
    /// Hooks to load, in notification order
    pub hooks: Vec<String>,
    pub log_level: String,
    /// deb822 stanzas excluding packages or files from extraction
    pub exclude_file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mirror_dir: PathBuf::from("/srv/srcmirror/mirror"),
            archive_dir: None,
            sources_dir: PathBuf::from("/srv/srcmirror/sources"),
            cache_dir: PathBuf::from("/srv/srcmirror/cache"),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            dry_run: false,
            passes: Passes::all(),
            stages: all_stages(),
            single_transaction: true,
            expire_days: 0,
            force_triggers: Vec::new(),
            hooks: default_hooks(),
            log_level: default_log_level(),
            exclude_file: None,
        }
    }
}

impl SyncConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Load `path` if given, else the default file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::load(Path::new(DEFAULT_CONFIG_PATH))
            }
            None => Ok(Self::default()),
        }
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for hook in &self.hooks {
            if !seen.insert(hook) {
                return Err(Error::Config(format!("hook {} listed twice", hook)));
            }
        }
        for trigger in &self.force_triggers {
            if !self.hooks.contains(&trigger.hook) {
                return Err(Error::Config(format!(
                    "trigger {} names a hook that is not loaded",
                    trigger
                )));
            }
        }
        if !["error", "warn", "warning", "info", "debug", "trace"]
            .contains(&self.log_level.as_str())
        {
            return Err(Error::Config(format!("unknown log level: {}", self.log_level)));
        }
        Ok(())
    }

    /// Mirror used by the archive commands
    pub fn archive_dir(&self) -> &Path {
        self.archive_dir.as_deref().unwrap_or(&self.mirror_dir)
    }

    /// `tracing` filter directive for `log_level`
    pub fn log_filter(&self) -> &str {
        match self.log_level.as_str() {
            "warning" => "warn",
            level => level,
        }
    }

    /// Log settings that deviate from a normal full run
    pub fn warn_non_defaults(&self) {
        if self.dry_run {
            warn!("dry run: no changes will be made to the sources store or database");
        }
        if self.passes != Passes::all() {
            warn!("only using passes: {}", self.passes);
        }
        if self.stages != all_stages() {
            let stages: Vec<&str> = self.stages.iter().map(Stage::as_str).collect();
            warn!("only running stages: {}", stages.join(" "));
        }
        if !self.force_triggers.is_empty() {
            let triggers: Vec<String> =
                self.force_triggers.iter().map(ToString::to_string).collect();
            warn!("forcing triggers: {}", triggers.join(" "));
        }
    }
}
