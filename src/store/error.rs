use std::path::PathBuf;

use thiserror::Error;

use crate::bank::BankError;
use crate::imaging::ReshapeError;

/// Persistence failures. Missing files, unreadable or unwritable files, and
/// structurally invalid documents are distinct variants.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy image {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed question bank document {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize question bank: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid question bank document {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("stored question {qid:?} is invalid: {source}")]
    Question {
        qid: String,
        #[source]
        source: BankError,
    },

    #[error("image for question {qid:?} not found: {}", path.display())]
    ImageNotFound { qid: String, path: PathBuf },

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Image(#[from] ReshapeError),
}
