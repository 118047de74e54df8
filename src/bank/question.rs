//! A single validated multiple-choice question.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::BankError;

/// The chapter a question belongs to: positive number plus display name.
///
/// Questions cache their owning chapter so downstream consumers (labeling,
/// embedding) can format them without going back to the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub number: u32,
    pub name: String,
}

impl Chapter {
    pub fn new(number: u32, name: impl Into<String>) -> Result<Self, BankError> {
        let name = name.into();
        if number == 0 || name.trim().is_empty() {
            return Err(BankError::InvalidChapter { number, name });
        }
        Ok(Self { number, name })
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.number, self.name)
    }
}

/// A multiple-choice question.
///
/// Invariant: `correct_answer` is always one of `answers`, and there are at
/// least two non-empty answers. All mutation goes through setters that
/// re-validate the touched field and leave the question unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    qid: String,
    chapter: Option<Chapter>,
    question: String,
    img_path: Option<PathBuf>,
    answers: BTreeSet<String>,
    correct_answer: String,
    tags: Vec<String>,
    keywords: Vec<String>,
}

impl Question {
    /// Build a question, validating in a fixed order: qid, question text,
    /// answer count, empty answers, correct-answer membership, image path.
    pub fn new<I, S>(
        qid: impl Into<String>,
        question: impl Into<String>,
        answers: I,
        correct_answer: impl Into<String>,
        img_path: Option<PathBuf>,
    ) -> Result<Self, BankError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let qid = qid.into();
        let question = question.into();
        let answers: BTreeSet<String> = answers.into_iter().map(Into::into).collect();
        let correct_answer = correct_answer.into();

        if qid.is_empty() {
            return Err(BankError::format("question ID must be a non-empty string"));
        }
        if question.is_empty() {
            return Err(BankError::format("question text must be a non-empty string"));
        }
        if answers.len() < 2 {
            return Err(BankError::format(format!(
                "there must be at least two answers, got {}",
                answers.len()
            )));
        }
        if answers.contains("") {
            return Err(BankError::format("answers cannot contain empty strings"));
        }
        if !answers.contains(&correct_answer) {
            return Err(BankError::format(format!(
                "correct answer {correct_answer:?} must be one of the provided answers"
            )));
        }
        if let Some(path) = &img_path {
            if path.as_os_str().is_empty() {
                return Err(BankError::format("image path must be non-empty when present"));
            }
        }

        Ok(Self {
            qid,
            chapter: None,
            question,
            img_path,
            answers,
            correct_answer,
            tags: Vec::new(),
            keywords: Vec::new(),
        })
    }

    pub fn qid(&self) -> &str {
        &self.qid
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answers(&self) -> &BTreeSet<String> {
        &self.answers
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn img_path(&self) -> Option<&Path> {
        self.img_path.as_deref()
    }

    pub fn chapter(&self) -> Option<&Chapter> {
        self.chapter.as_ref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn has_img(&self) -> bool {
        self.img_path.is_some()
    }

    /// Replace the image path; `None` makes the question text-only.
    ///
    /// Existence on disk is not checked here: the persistence layer decides
    /// what a dangling path means when the bank is loaded.
    pub fn set_img_path(&mut self, path: Option<PathBuf>) -> Result<(), BankError> {
        if let Some(p) = &path {
            if p.as_os_str().to_string_lossy().trim().is_empty() {
                return Err(BankError::InvalidImagePath { path: p.clone() });
            }
        }
        self.img_path = path;
        Ok(())
    }

    pub fn set_chapter(&mut self, number: u32, name: impl Into<String>) -> Result<(), BankError> {
        self.chapter = Some(Chapter::new(number, name)?);
        Ok(())
    }

    /// Replace all tags. Entries are trimmed; blanks and duplicates are rejected.
    pub fn set_tags<I, S>(&mut self, tags: I) -> Result<(), BankError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = validate_labels(tags)?;
        Ok(())
    }

    /// Replace all keywords. Same rules as [`set_tags`](Self::set_tags).
    pub fn set_keywords<I, S>(&mut self, keywords: I) -> Result<(), BankError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = validate_labels(keywords)?;
        Ok(())
    }

    /// Add a tag unless it is already present.
    pub fn add_tag(&mut self, tag: &str) -> Result<(), BankError> {
        add_label(&mut self.tags, tag)
    }

    /// Add a keyword unless it is already present.
    pub fn add_keyword(&mut self, keyword: &str) -> Result<(), BankError> {
        add_label(&mut self.keywords, keyword)
    }
}

fn trimmed_label(raw: &str) -> Result<String, BankError> {
    let label = raw.trim();
    if label.is_empty() {
        return Err(BankError::InvalidLabel {
            value: raw.to_string(),
            reason: "labels must be non-empty strings",
        });
    }
    Ok(label.to_string())
}

fn validate_labels<I, S>(raw: I) -> Result<Vec<String>, BankError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut labels: Vec<String> = Vec::new();
    for item in raw {
        let label = trimmed_label(item.as_ref())?;
        if labels.contains(&label) {
            return Err(BankError::InvalidLabel {
                value: label,
                reason: "labels must be unique",
            });
        }
        labels.push(label);
    }
    Ok(labels)
}

fn add_label(labels: &mut Vec<String>, raw: &str) -> Result<(), BankError> {
    let label = trimmed_label(raw)?;
    if !labels.contains(&label) {
        labels.push(label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Question {
        Question::new("q1", "Test question?", ["A", "B"], "A", None).unwrap()
    }

    #[test]
    fn valid_question_has_defaults() {
        let q = sample();
        assert_eq!(q.qid(), "q1");
        assert_eq!(q.question(), "Test question?");
        assert_eq!(q.correct_answer(), "A");
        assert!(q.chapter().is_none());
        assert!(q.tags().is_empty());
        assert!(q.keywords().is_empty());
        assert!(!q.has_img());
    }

    #[test]
    fn single_answer_is_rejected() {
        let err = Question::new("q1", "x?", ["a"], "a", None).unwrap_err();
        assert!(matches!(err, BankError::IncorrectFormat { .. }));
        assert!(err.to_string().contains("at least two answers"));
    }

    #[test]
    fn duplicate_answers_collapse_before_counting() {
        let err = Question::new("q1", "x?", ["a", "a"], "a", None).unwrap_err();
        assert!(err.to_string().contains("at least two answers"));
    }

    #[test]
    fn validation_order_reports_first_violation() {
        // Empty qid wins over every later problem.
        let err = Question::new("", "", ["a"], "z", None).unwrap_err();
        assert!(err.to_string().contains("question ID"));

        let err = Question::new("q1", "", ["a"], "z", None).unwrap_err();
        assert!(err.to_string().contains("question text"));

        let err = Question::new("q1", "x?", ["a", ""], "z", None).unwrap_err();
        assert!(err.to_string().contains("empty strings"));

        let err = Question::new("q1", "x?", ["a", "b"], "z", None).unwrap_err();
        assert!(err.to_string().contains("correct answer"));

        let err = Question::new("q1", "x?", ["a", "b"], "a", Some(PathBuf::new())).unwrap_err();
        assert!(err.to_string().contains("image path"));
    }

    #[test]
    fn set_img_path_round_trip() {
        let mut q = sample();
        q.set_img_path(Some(PathBuf::from("imgs/q1.jpg"))).unwrap();
        assert!(q.has_img());
        assert_eq!(q.img_path(), Some(Path::new("imgs/q1.jpg")));

        q.set_img_path(None).unwrap();
        assert!(!q.has_img());
    }

    #[test]
    fn set_img_path_rejects_blank() {
        let mut q = sample();
        q.set_img_path(Some(PathBuf::from("imgs/q1.jpg"))).unwrap();
        let err = q.set_img_path(Some(PathBuf::from("   "))).unwrap_err();
        assert!(matches!(err, BankError::InvalidImagePath { .. }));
        // unchanged on failure
        assert_eq!(q.img_path(), Some(Path::new("imgs/q1.jpg")));
    }

    #[test]
    fn set_chapter_validates() {
        let mut q = sample();
        q.set_chapter(3, "Road signs").unwrap();
        assert_eq!(q.chapter(), Some(&Chapter::new(3, "Road signs").unwrap()));

        assert!(matches!(
            q.set_chapter(0, "Zero"),
            Err(BankError::InvalidChapter { number: 0, .. })
        ));
        assert!(matches!(
            q.set_chapter(2, "   "),
            Err(BankError::InvalidChapter { .. })
        ));
        assert_eq!(q.chapter().unwrap().number, 3);
    }

    #[test]
    fn tags_are_trimmed() {
        let mut q = sample();
        q.set_tags(["  traffic  ", "\tspeed\t", "\nrules\n"]).unwrap();
        assert_eq!(q.tags(), ["traffic", "speed", "rules"]);
    }

    #[test]
    fn set_tags_rejects_blank_and_duplicates() {
        let mut q = sample();
        q.set_tags(["kept"]).unwrap();

        let err = q.set_tags(["ok", "   "]).unwrap_err();
        assert!(err.to_string().contains("non-empty"));

        let err = q.set_tags(["dup", " dup "]).unwrap_err();
        assert!(err.to_string().contains("unique"));

        assert_eq!(q.tags(), ["kept"]);
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut q = sample();
        q.add_tag("existing").unwrap();
        q.add_tag("existing").unwrap();
        q.add_tag(" existing ").unwrap();
        assert_eq!(q.tags(), ["existing"]);
        assert!(q.add_tag("  ").is_err());
    }

    #[test]
    fn keywords_follow_tag_rules() {
        let mut q = sample();
        q.set_keywords(["  speed limit ", "driving"]).unwrap();
        q.add_keyword("driving").unwrap();
        q.add_keyword("safety").unwrap();
        assert_eq!(q.keywords(), ["speed limit", "driving", "safety"]);
        assert!(q.set_keywords([""]).is_err());
    }

    #[test]
    fn cloned_answers_do_not_alias() {
        let q = sample();
        let mut answers = q.answers().clone();
        answers.insert("C".into());
        assert_eq!(q.answers().len(), 2);
    }
}
