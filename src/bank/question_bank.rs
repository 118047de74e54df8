//! The question bank aggregate: chapters, membership, and owned questions.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::error::BankError;
use super::question::Question;

/// A collection of questions grouped into numbered chapters.
///
/// Invariants:
/// 1. `chapters` and `chapter_to_qids` have identical key sets.
/// 2. Every stored question belongs to exactly one chapter.
/// 3. Chapter numbers are positive and descriptions are non-blank.
///
/// `img_dir` is bank-level metadata naming where the question images live; it
/// must exist as a directory.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    img_dir: PathBuf,
    chapters: BTreeMap<u32, String>,
    chapter_to_qids: BTreeMap<u32, BTreeSet<String>>,
    questions: BTreeMap<String, Question>,
}

impl QuestionBank {
    /// Create an empty bank rooted at an existing image directory.
    pub fn new(img_dir: impl AsRef<Path>) -> Result<Self, BankError> {
        Ok(Self {
            img_dir: validated_dir(img_dir.as_ref())?,
            chapters: BTreeMap::new(),
            chapter_to_qids: BTreeMap::new(),
            questions: BTreeMap::new(),
        })
    }

    /// Insert a new chapter. Fails if the number is already taken.
    pub fn add_chapter(&mut self, chapter_num: u32, description: impl Into<String>) -> Result<(), BankError> {
        let description = description.into();
        if chapter_num == 0 || description.trim().is_empty() {
            return Err(BankError::InvalidChapter {
                number: chapter_num,
                name: description,
            });
        }
        if self.chapters.contains_key(&chapter_num) {
            return Err(BankError::ChapterExists(chapter_num));
        }
        self.chapters.insert(chapter_num, description);
        self.chapter_to_qids.insert(chapter_num, BTreeSet::new());
        Ok(())
    }

    /// Register a question under a chapter.
    ///
    /// Re-adding an existing qid replaces the stored question and moves it out
    /// of its previous chapter. The question's cached chapter is refreshed.
    pub fn add_question(&mut self, mut question: Question, chapter_num: u32) -> Result<(), BankError> {
        let description = self
            .chapters
            .get(&chapter_num)
            .ok_or(BankError::ChapterNotFound(chapter_num))?;
        question.set_chapter(chapter_num, description.clone())?;

        let qid = question.qid().to_string();
        for (num, members) in self.chapter_to_qids.iter_mut() {
            if *num != chapter_num && members.remove(&qid) {
                tracing::debug!(qid = %qid, from = num, to = chapter_num, "moving question between chapters");
            }
        }
        self.chapter_to_qids
            .entry(chapter_num)
            .or_default()
            .insert(qid.clone());
        self.questions.insert(qid, question);
        Ok(())
    }

    pub fn get_question(&self, qid: &str) -> Result<&Question, BankError> {
        self.questions
            .get(qid)
            .ok_or_else(|| BankError::QuestionNotFound(qid.to_string()))
    }

    /// Point a question at a new image, or make it text-only with `None`.
    pub fn set_question_img_path(&mut self, qid: &str, img_path: Option<PathBuf>) -> Result<(), BankError> {
        self.questions
            .get_mut(qid)
            .ok_or_else(|| BankError::QuestionNotFound(qid.to_string()))?
            .set_img_path(img_path)
    }

    /// Replace a question's tags and keywords together. Either list failing
    /// validation leaves the question unchanged.
    pub fn set_question_labels<T, K>(&mut self, qid: &str, tags: T, keywords: K) -> Result<(), BankError>
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let question = self
            .questions
            .get_mut(qid)
            .ok_or_else(|| BankError::QuestionNotFound(qid.to_string()))?;
        let mut updated = question.clone();
        updated.set_tags(tags)?;
        updated.set_keywords(keywords)?;
        *question = updated;
        Ok(())
    }

    /// Question IDs in a chapter (an owned copy).
    pub fn get_qids_by_chapter(&self, chapter_num: u32) -> Result<BTreeSet<String>, BankError> {
        self.chapter_to_qids
            .get(&chapter_num)
            .cloned()
            .ok_or(BankError::ChapterNotFound(chapter_num))
    }

    pub fn describe_chapter(&self, chapter_num: u32) -> Result<&str, BankError> {
        self.chapters
            .get(&chapter_num)
            .map(String::as_str)
            .ok_or(BankError::ChapterNotFound(chapter_num))
    }

    /// Chapter numbers in ascending order.
    pub fn list_chapters(&self) -> Vec<u32> {
        self.chapters.keys().copied().collect()
    }

    /// All question IDs, lexicographically ascending.
    pub fn get_qid_list(&self) -> Vec<String> {
        self.questions.keys().cloned().collect()
    }

    /// Iterate questions in qid order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }

    /// Total count, or the count for one chapter.
    pub fn question_count(&self, chapter_num: Option<u32>) -> Result<usize, BankError> {
        match chapter_num {
            None => Ok(self.questions.len()),
            Some(num) => self
                .chapter_to_qids
                .get(&num)
                .map(BTreeSet::len)
                .ok_or(BankError::ChapterNotFound(num)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn img_dir(&self) -> &Path {
        &self.img_dir
    }

    /// Point the bank at a different image directory. Surrounding whitespace
    /// is trimmed and the directory must exist.
    pub fn set_img_dir(&mut self, img_dir: impl AsRef<Path>) -> Result<(), BankError> {
        self.img_dir = validated_dir(img_dir.as_ref())?;
        Ok(())
    }

    /// Verify the three structural invariants plus the qid/record agreement.
    pub fn check_invariants(&self) -> Result<(), BankError> {
        let chapter_keys: BTreeSet<&u32> = self.chapters.keys().collect();
        let member_keys: BTreeSet<&u32> = self.chapter_to_qids.keys().collect();
        if chapter_keys != member_keys {
            return Err(BankError::Inconsistent(format!(
                "chapter numbers {chapter_keys:?} do not match membership keys {member_keys:?}"
            )));
        }

        for (num, description) in &self.chapters {
            if *num == 0 || description.trim().is_empty() {
                return Err(BankError::InvalidChapter {
                    number: *num,
                    name: description.clone(),
                });
            }
        }

        let mut owners: BTreeMap<&str, usize> = BTreeMap::new();
        for members in self.chapter_to_qids.values() {
            for qid in members {
                *owners.entry(qid.as_str()).or_default() += 1;
            }
        }
        for qid in self.questions.keys() {
            match owners.get(qid.as_str()) {
                Some(1) => {}
                Some(n) => {
                    return Err(BankError::Inconsistent(format!(
                        "question {qid:?} belongs to {n} chapters"
                    )))
                }
                None => {
                    return Err(BankError::Inconsistent(format!(
                        "question {qid:?} does not belong to any chapter"
                    )))
                }
            }
        }
        if let Some(orphan) = owners.keys().find(|qid| !self.questions.contains_key(**qid)) {
            return Err(BankError::Inconsistent(format!(
                "chapter membership lists unknown question {orphan:?}"
            )));
        }
        Ok(())
    }
}

fn validated_dir(raw: &Path) -> Result<PathBuf, BankError> {
    let trimmed = PathBuf::from(raw.to_string_lossy().trim());
    if trimmed.as_os_str().is_empty() || !trimmed.is_dir() {
        return Err(BankError::ImageDirNotFound { path: trimmed });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn question(qid: &str) -> Question {
        Question::new(qid, format!("{qid}?"), ["yes", "no"], "yes", None).unwrap()
    }

    fn bank(tmp: &TempDir) -> QuestionBank {
        let mut qb = QuestionBank::new(tmp.path()).unwrap();
        qb.add_chapter(1, "Signs").unwrap();
        qb.add_chapter(2, "Rules").unwrap();
        qb
    }

    #[test]
    fn new_requires_existing_directory() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            QuestionBank::new(&missing),
            Err(BankError::ImageDirNotFound { .. })
        ));
    }

    #[test]
    fn add_chapter_is_insert_only() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        assert!(matches!(qb.add_chapter(1, "Again"), Err(BankError::ChapterExists(1))));
        assert_eq!(qb.describe_chapter(1).unwrap(), "Signs");
    }

    #[test]
    fn add_chapter_validates_input() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        assert!(matches!(qb.add_chapter(0, "Zero"), Err(BankError::InvalidChapter { .. })));
        assert!(matches!(qb.add_chapter(3, "  "), Err(BankError::InvalidChapter { .. })));
        assert_eq!(qb.list_chapters(), vec![1, 2]);
    }

    #[test]
    fn add_question_to_missing_chapter_leaves_bank_unchanged() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        let err = qb.add_question(question("q9"), 7).unwrap_err();
        assert!(matches!(err, BankError::ChapterNotFound(7)));
        assert_eq!(qb.question_count(None).unwrap(), 0);
        assert!(qb.get_question("q9").is_err());
        qb.check_invariants().unwrap();
    }

    #[test]
    fn add_question_sets_cached_chapter() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        qb.add_question(question("q1"), 2).unwrap();
        let chapter = qb.get_question("q1").unwrap().chapter().unwrap();
        assert_eq!(chapter.number, 2);
        assert_eq!(chapter.name, "Rules");
    }

    #[test]
    fn re_adding_moves_question_between_chapters() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        qb.add_question(question("q1"), 1).unwrap();
        let replacement = Question::new("q1", "changed?", ["a", "b"], "b", None).unwrap();
        qb.add_question(replacement, 2).unwrap();

        assert_eq!(qb.question_count(None).unwrap(), 1);
        assert!(qb.get_qids_by_chapter(1).unwrap().is_empty());
        assert!(qb.get_qids_by_chapter(2).unwrap().contains("q1"));
        assert_eq!(qb.get_question("q1").unwrap().question(), "changed?");
        qb.check_invariants().unwrap();
    }

    #[test]
    fn counts_and_listing() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        qb.add_question(question("q2"), 1).unwrap();
        qb.add_question(question("q1"), 1).unwrap();
        qb.add_question(question("q3"), 2).unwrap();

        assert_eq!(qb.question_count(None).unwrap(), 3);
        assert_eq!(qb.question_count(Some(1)).unwrap(), 2);
        assert!(matches!(qb.question_count(Some(5)), Err(BankError::ChapterNotFound(5))));
        assert_eq!(qb.get_qid_list(), vec!["q1", "q2", "q3"]);
        assert_eq!(
            qb.get_qids_by_chapter(2).unwrap(),
            BTreeSet::from(["q3".to_string()])
        );
    }

    #[test]
    fn qids_by_chapter_is_a_copy() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        qb.add_question(question("q1"), 1).unwrap();
        let mut ids = qb.get_qids_by_chapter(1).unwrap();
        ids.insert("ghost".into());
        assert_eq!(qb.question_count(Some(1)).unwrap(), 1);
    }

    #[test]
    fn lookups_fail_for_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let qb = bank(&tmp);
        assert!(matches!(qb.get_question("x"), Err(BankError::QuestionNotFound(_))));
        assert!(matches!(qb.describe_chapter(9), Err(BankError::ChapterNotFound(9))));
        assert!(matches!(qb.get_qids_by_chapter(9), Err(BankError::ChapterNotFound(9))));
    }

    #[test]
    fn set_img_dir_trims_and_validates() {
        let tmp = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let mut qb = bank(&tmp);

        let padded = format!("  {}  ", other.path().display());
        qb.set_img_dir(&padded).unwrap();
        assert_eq!(qb.img_dir(), other.path());

        assert!(qb.set_img_dir(other.path().join("missing")).is_err());
        assert_eq!(qb.img_dir(), other.path());
    }

    #[test]
    fn question_setters_go_through_the_bank() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        qb.add_question(question("q1"), 1).unwrap();

        qb.set_question_img_path("q1", Some(tmp.path().join("q1.png"))).unwrap();
        assert!(qb.get_question("q1").unwrap().has_img());
        assert!(matches!(
            qb.set_question_img_path("q9", None),
            Err(BankError::QuestionNotFound(_))
        ));

        qb.set_question_labels("q1", ["signs"], ["red"]).unwrap();
        let q = qb.get_question("q1").unwrap();
        assert_eq!(q.tags(), ["signs"]);
        assert_eq!(q.keywords(), ["red"]);
        assert_eq!(q.chapter().unwrap().number, 1);
    }

    #[test]
    fn rejected_labels_leave_question_unchanged() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        qb.add_question(question("q1"), 1).unwrap();
        qb.set_question_labels("q1", ["signs"], ["red"]).unwrap();

        // tags are valid, keywords are not
        let err = qb.set_question_labels("q1", ["rules"], ["a", "a"]).unwrap_err();
        assert!(matches!(err, BankError::InvalidLabel { .. }));
        let q = qb.get_question("q1").unwrap();
        assert_eq!(q.tags(), ["signs"]);
        assert_eq!(q.keywords(), ["red"]);
        qb.check_invariants().unwrap();
    }
}
