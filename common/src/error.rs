use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems with a scan request, detected before any process is spawned.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("either a target or a target list must be specified")]
    MissingTarget,

    #[error("a single target and a target list cannot be combined")]
    ConflictingTargets,

    #[error("target list file '{}' not found", .0.display())]
    TargetListMissing(PathBuf),

    #[error("target list file '{}' is not readable: {source}", path.display())]
    TargetListUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to read a result file written by an external tool.
///
/// Malformed lines inside a readable file are not errors; they are skipped.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("result file '{}' not found", .0.display())]
    Missing(PathBuf),

    #[error("could not read result file '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure while editing shell start-up files.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("could not update '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not restore '{}' after a failed update: {source}", path.display())]
    Rollback {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
