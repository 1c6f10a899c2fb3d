//! Error taxonomy for an acquisition run.
//!
//! Only [`AcquireError::is_fatal`] variants abort a run. Everything else is
//! scoped to a single date and turned into a skip by the acquisition loop.
//! "No data" is deliberately absent here: it is a normal outcome of an
//! export, see [`crate::schedule::ExportOutcome`].

use std::path::PathBuf;

/// Configuration problems, detected before any browser is launched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid login URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("cannot read env file {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },
}

/// Why an export file produced no records.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("cannot read export {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no candidate encoding yields recognizable content")]
    UnknownEncoding,

    #[error("export contains no table")]
    NoTable,
}

/// Failures raised while driving the schedule application.
#[derive(thiserror::Error, Debug)]
pub enum AcquireError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("login failed: {0}")]
    Auth(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("cannot select date {date}: {reason}")]
    DateSelection { date: String, reason: String },

    #[error("browser error: {0:#}")]
    Browser(#[from] anyhow::Error),

    #[error("step '{step}' requires state {expected}, session is {actual}")]
    InvalidState {
        step: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquireError {
    /// Whether this failure must abort the whole run rather than one date.
    pub fn is_fatal(&self) -> bool {
        match self {
            AcquireError::Config(_)
            | AcquireError::Auth(_)
            | AcquireError::Navigation(_)
            | AcquireError::DateSelection { .. }
            | AcquireError::InvalidState { .. } => true,
            AcquireError::Browser(_) | AcquireError::Io(_) => false,
        }
    }
}

pub type AcquireResult<T> = Result<T, AcquireError>;
