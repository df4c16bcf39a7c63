//! Error taxonomy for the retrieval core.
//!
//! Parse-level failures are absorbed by the connectors (see
//! [`ScanReport`](crate::traits::ScanReport)); everything else is fatal to
//! the operation that raised it and is propagated to the caller.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input is absent or unusable (delimited-text file missing,
    /// header columns missing). Fatal to a build; no artifact is written.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single markup file could not be parsed.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The persisted corpus is missing or corrupt.
    #[error(
        "corpus store unavailable at {}: {reason}. Run `medirag build` to (re)create it",
        path.display()
    )]
    StoreUnavailable { path: PathBuf, reason: String },

    /// The embedding capability failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn embedding(msg: impl std::fmt::Display) -> Self {
        Error::Embedding(msg.to_string())
    }

    pub(crate) fn store_unavailable(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
