// src/error.rs

//! Error types for srcmirror

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the synchronization engine
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error with context
    #[error("IO error: {0}")]
    IoError(String),

    /// Directory traversal failed
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Database initialization or migration failed
    #[error("initialization error: {0}")]
    InitError(String),

    /// External tool exited unsuccessfully or could not be spawned
    #[error("command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Malformed input that cannot be skipped
    #[error("parse error: {0}")]
    ParseError(String),

    /// Expected record is missing
    #[error("not found: {0}")]
    NotFoundError(String),

    /// Mirror layout is unusable
    #[error("mirror error at {path}: {message}")]
    Mirror { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("configuration syntax error: {0}")]
    ConfigSyntax(#[from] toml::de::Error),

    /// Invalid glob in an exclusion stanza
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Hook subscribed to an event that does not exist
    #[error("unknown hook event: {0}")]
    UnknownEvent(String),

    /// Configuration names a hook that is not available
    #[error("unknown hook: {0}")]
    UnknownHook(String),

    /// Two hooks claimed the same sidecar extension
    #[error("extension {ext} already claimed by hook {owner}")]
    DuplicateExtension { ext: String, owner: String },

    /// Hook callback failed
    #[error("hook {hook} failed on {package}: {source}")]
    Hook {
        hook: String,
        package: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Build a `CommandFailed` error for the given program
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }
}
