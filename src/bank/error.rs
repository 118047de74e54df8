//! Validation errors raised by [`Question`](super::Question) and
//! [`QuestionBank`](super::QuestionBank).

use std::path::PathBuf;
use thiserror::Error;

/// Errors from constructing or mutating questions and question banks.
#[derive(Debug, Error)]
pub enum BankError {
    /// A question failed construction-time validation. Carries the first
    /// violation found.
    #[error("incorrect question format: {reason}")]
    IncorrectFormat { reason: String },

    /// Chapter number is zero or the chapter name is blank.
    #[error("invalid chapter ({number}, {name:?}): number must be positive and name non-empty")]
    InvalidChapter { number: u32, name: String },

    /// A tag or keyword is empty after trimming, or repeats an earlier entry.
    #[error("invalid label {value:?}: {reason}")]
    InvalidLabel { value: String, reason: &'static str },

    /// An image path was supplied but is empty.
    #[error("invalid image path {path:?}: path must be non-empty")]
    InvalidImagePath { path: PathBuf },

    /// `add_chapter` is insert-only.
    #[error("chapter {0} already exists")]
    ChapterExists(u32),

    #[error("chapter {0} not found")]
    ChapterNotFound(u32),

    #[error("question {0:?} not found")]
    QuestionNotFound(String),

    /// The bank's image directory is missing or not a directory.
    #[error("image directory does not exist or is not a directory: {}", path.display())]
    ImageDirNotFound { path: PathBuf },

    /// Cross-collection consistency check failed.
    #[error("inconsistent question bank: {0}")]
    Inconsistent(String),
}

impl BankError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::IncorrectFormat {
            reason: reason.into(),
        }
    }
}
