//! Question bank persistence.

pub mod error;
pub mod json;

pub use error::StoreError;
pub use json::JsonDatabase;

use serde::{Deserialize, Serialize};

use crate::bank::QuestionBank;

/// A backing store holding one question bank.
pub trait Database {
    /// Persist `bank`, overwriting whatever was stored before.
    fn save(&self, bank: &QuestionBank) -> Result<bool, StoreError>;

    /// Reconstruct the stored bank.
    fn load(&self) -> Result<QuestionBank, StoreError>;
}

/// How question images are written into the store's image directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ImagePolicy {
    /// Byte copy, keeping the source extension.
    #[default]
    Preserve,
    /// Decode and re-encode every image to one extension.
    Convert { extension: String },
}

/// What `load` does with a record whose image file is gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingImagePolicy {
    #[default]
    Error,
    /// Keep the question as text-only and log a warning.
    Drop,
}
