use std::path::PathBuf;

use thiserror::Error;

use crate::bank::BankError;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("{field} must be a non-empty string")]
    EmptyField { field: &'static str },

    #[error("start and end tags must be different, both are {tag:?}")]
    SameTags { tag: String },

    #[error("question {qid:?} has no chapter; add it to a question bank first")]
    MissingChapter { qid: String },

    #[error("question {qid:?} has {count} answers, at most 26 can be lettered")]
    TooManyAnswers { qid: String, count: usize },

    #[error("failed to encode image {} for question {qid:?}: {source}", path.display())]
    ImageRead {
        qid: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

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

    #[error("failed to serialize request {custom_id:?}: {source}")]
    Serialize {
        custom_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}:{line}: malformed response line: {source}", path.display())]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid response {custom_id:?} at {field}: {reason}")]
    InvalidResponse {
        custom_id: String,
        field: String,
        reason: String,
    },

    #[error("message content does not contain valid output tags {start:?} and {end:?}")]
    MissingTags { start: String, end: String },

    #[error("message content contains multiple start or end tags")]
    MultipleTags,

    #[error("start tag must appear before end tag in message content")]
    TagOrder,

    #[error("invalid JSON format in labeling output: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("labels returned for unknown question {0:?}")]
    UnknownQuestion(String),

    #[error(transparent)]
    Bank(#[from] BankError),
}
