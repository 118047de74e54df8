//! Question bank toolkit.
//!
//! Stores multiple-choice questions grouped into numbered chapters, each
//! optionally illustrated by an image, and prepares them for downstream
//! machine learning work.
//!
//! # Modules
//!
//! - [`bank`]: `Question` and `QuestionBank` with their validation rules
//! - [`store`]: JSON document + image directory persistence
//! - [`imaging`]: aspect-preserving reshaping onto a fixed canvas, bank-wide formatting
//! - [`labeling`]: batch request files for a chat-completion API and parsing of the results
//! - [`embedding`]: joint text/image embeddings via ONNX Runtime
//! - [`config`]: configuration loading from TOML files and environment variables

pub mod bank;
pub mod config;
pub mod embedding;
pub mod imaging;
pub mod labeling;
pub mod store;
