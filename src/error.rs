//! Crate-level error types for scholar-sync

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for scholar-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can surface past the run pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization error (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No new stats were fetched and no previous snapshot exists.
    /// The only error that maps to a failing exit status.
    #[error("no stats fetched and no existing snapshot at {}", .0.display())]
    NoPriorData(PathBuf),
}
