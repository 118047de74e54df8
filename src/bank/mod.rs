//! Question bank domain model.
//!
//! [`Question`] is a validated multiple-choice record; [`QuestionBank`] owns
//! questions grouped into numbered chapters and enforces that every question
//! belongs to exactly one chapter.

pub mod error;
pub mod question;
pub mod question_bank;

pub use error::BankError;
pub use question::{Chapter, Question};
pub use question_bank::QuestionBank;
