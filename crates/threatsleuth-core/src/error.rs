/// Error types for the core crate.
///
/// Only controller-level failures surface as [`ScanError`]; file actions
/// report [`ActionError`]. Per-entry traversal errors and per-file read
/// errors are absorbed by the worker and the detection pipeline and never
/// reach a caller.
use std::path::PathBuf;
use thiserror::Error;

/// Failure returned by [`crate::Scanner::start_scan`].
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan is already in flight on this scanner. No state was changed.
    #[error("a scan is already in progress")]
    AlreadyRunning,

    /// The OS refused to create the worker thread.
    #[error("failed to spawn scanner thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Failure while loading or saving configuration or signature files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialise config: {0}")]
    Serialise(#[source] serde_yaml::Error),

    /// A hash-list line did not hold a 64-character hex SHA-256 digest.
    #[error("{path}:{line}: invalid SHA-256 digest {value:?}")]
    InvalidHash {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

/// Failure of a per-file response action (quarantine, lock, unlock).
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("failed to create quarantine directory {path}: {source}")]
    QuarantineDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither a rename nor a copy could move the file. The original is
    /// left where it was.
    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to change permissions of {path}: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
