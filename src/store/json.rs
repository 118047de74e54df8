//! JSON document + image directory store.
//!
//! Layout on disk:
//! - `{path}`: pretty-printed [`BankDocument`]; `{}` means "no data yet".
//! - `{img_dir}/{qid}.{ext}`: one image per question that has one.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bank::{Question, QuestionBank};
use crate::imaging::{load_image, normalize_extension, save_image};

use super::{Database, ImagePolicy, MissingImagePolicy, StoreError};

/// On-disk shape of a question bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankDocument {
    pub chapters: BTreeMap<u32, String>,
    pub chap_to_qids: BTreeMap<u32, Vec<String>>,
    pub questions: BTreeMap<String, QuestionRecord>,
    pub img_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub qid: String,
    pub question: String,
    pub answers: Vec<String>,
    pub correct_answer: String,
    /// Empty string for text-only questions.
    #[serde(default)]
    pub img_path: String,
    pub chapter: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A [`Database`] backed by a local JSON file.
#[derive(Debug, Clone)]
pub struct JsonDatabase {
    path: PathBuf,
    img_dir: PathBuf,
    image_policy: ImagePolicy,
    missing_image: MissingImagePolicy,
}

impl JsonDatabase {
    pub fn new(path: impl Into<PathBuf>, img_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            img_dir: img_dir.into(),
            image_policy: ImagePolicy::default(),
            missing_image: MissingImagePolicy::default(),
        }
    }

    pub fn with_image_policy(mut self, policy: ImagePolicy) -> Self {
        self.image_policy = policy;
        self
    }

    pub fn with_missing_image_policy(mut self, policy: MissingImagePolicy) -> Self {
        self.missing_image = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn img_dir(&self) -> &Path {
        &self.img_dir
    }

    /// Write an empty `{}` document unless one already exists. Also creates the
    /// image directory. Returns `true` when a new file was written.
    pub fn init(&self) -> Result<bool, StoreError> {
        create_dir(&self.img_dir)?;
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
        std::fs::write(&self.path, "{}").map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(true)
    }

    /// Where a question's image lives once stored.
    fn stored_image_path(&self, question: &Question, source: &Path) -> Result<PathBuf, StoreError> {
        let extension = match &self.image_policy {
            ImagePolicy::Convert { extension } => normalize_extension(extension)?,
            ImagePolicy::Preserve => {
                let ext = source.extension().and_then(|e| e.to_str()).unwrap_or_default();
                normalize_extension(ext)?
            }
        };
        Ok(self.img_dir.join(format!("{}.{extension}", question.qid())))
    }

    fn store_image(&self, question: &Question, source: &Path) -> Result<PathBuf, StoreError> {
        let dest = self.stored_image_path(question, source)?;
        if same_file(source, &dest) {
            return Ok(dest);
        }

        match &self.image_policy {
            ImagePolicy::Preserve => {
                std::fs::copy(source, &dest).map_err(|e| StoreError::Copy {
                    from: source.to_path_buf(),
                    to: dest.clone(),
                    source: e,
                })?;
            }
            ImagePolicy::Convert { extension } => {
                let image = load_image(source)?;
                save_image(image, &dest, extension)?;
            }
        }
        tracing::debug!(qid = %question.qid(), from = %source.display(), to = %dest.display(), "stored image");
        Ok(dest)
    }

    fn to_document(&self, bank: &QuestionBank) -> Result<BankDocument, StoreError> {
        let mut doc = BankDocument {
            img_dir: self.img_dir.to_string_lossy().into_owned(),
            ..BankDocument::default()
        };

        for chapter in bank.list_chapters() {
            doc.chapters.insert(chapter, bank.describe_chapter(chapter)?.to_string());
            let qids: Vec<String> = bank.get_qids_by_chapter(chapter)?.into_iter().collect();

            for qid in &qids {
                let question = bank.get_question(qid)?;
                let img_path = match question.img_path() {
                    Some(source) => self.store_image(question, source)?.to_string_lossy().into_owned(),
                    None => String::new(),
                };
                doc.questions.insert(
                    qid.clone(),
                    QuestionRecord {
                        qid: qid.clone(),
                        question: question.question().to_string(),
                        answers: question.answers().iter().cloned().collect(),
                        correct_answer: question.correct_answer().to_string(),
                        img_path,
                        chapter,
                        tags: question.tags().to_vec(),
                        keywords: question.keywords().to_vec(),
                    },
                );
            }
            doc.chap_to_qids.insert(chapter, qids);
        }
        Ok(doc)
    }

    fn invalid(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Invalid {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    /// Map each qid to its single owning chapter, rejecting orphans and
    /// double membership.
    fn membership(&self, doc: &BankDocument) -> Result<BTreeMap<String, u32>, StoreError> {
        let chapter_keys: BTreeSet<&u32> = doc.chapters.keys().collect();
        let member_keys: BTreeSet<&u32> = doc.chap_to_qids.keys().collect();
        if chapter_keys != member_keys {
            return Err(self.invalid(format!(
                "chapters {chapter_keys:?} and chap_to_qids {member_keys:?} have different keys"
            )));
        }

        let mut owner: BTreeMap<String, u32> = BTreeMap::new();
        for (chapter, qids) in &doc.chap_to_qids {
            for qid in qids {
                if !doc.questions.contains_key(qid) {
                    return Err(self.invalid(format!(
                        "chapter {chapter} lists question {qid:?} which has no record"
                    )));
                }
                if let Some(previous) = owner.insert(qid.clone(), *chapter) {
                    return Err(self.invalid(format!(
                        "question {qid:?} is listed in chapters {previous} and {chapter}"
                    )));
                }
            }
        }
        Ok(owner)
    }

    fn resolve_image(&self, record: &QuestionRecord) -> Result<Option<PathBuf>, StoreError> {
        let raw = record.img_path.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(raw);
        if path.is_file() {
            return Ok(Some(path));
        }
        match self.missing_image {
            MissingImagePolicy::Error => Err(StoreError::ImageNotFound {
                qid: record.qid.clone(),
                path,
            }),
            MissingImagePolicy::Drop => {
                tracing::warn!(qid = %record.qid, path = %path.display(), "image missing, loading question as text-only");
                Ok(None)
            }
        }
    }

    fn from_document(&self, doc: BankDocument) -> Result<QuestionBank, StoreError> {
        let owner = self.membership(&doc)?;
        let mut bank = QuestionBank::new(&self.img_dir)?;

        for (number, description) in &doc.chapters {
            bank.add_chapter(*number, description.clone())?;
        }

        for (key, record) in &doc.questions {
            if *key != record.qid {
                return Err(self.invalid(format!(
                    "question stored under {key:?} has qid {:?}",
                    record.qid
                )));
            }
            let chapter = *owner
                .get(key)
                .ok_or_else(|| self.invalid(format!("question {key:?} does not belong to any chapter")))?;
            if record.chapter != chapter {
                tracing::warn!(
                    qid = %key,
                    recorded = record.chapter,
                    listed = chapter,
                    "chapter field disagrees with chap_to_qids; using chap_to_qids"
                );
            }

            let img_path = self.resolve_image(record)?;
            let question = build_question(record, img_path).map_err(|source| StoreError::Question {
                qid: key.clone(),
                source,
            })?;
            bank.add_question(question, chapter)?;
        }

        bank.check_invariants()?;
        Ok(bank)
    }
}

impl Database for JsonDatabase {
    fn save(&self, bank: &QuestionBank) -> Result<bool, StoreError> {
        bank.check_invariants()?;
        create_dir(&self.img_dir)?;

        let doc = self.to_document(bank)?;
        let json = serde_json::to_string_pretty(&doc).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
        std::fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(
            path = %self.path.display(),
            chapters = doc.chapters.len(),
            questions = doc.questions.len(),
            "question bank saved"
        );
        Ok(true)
    }

    fn load(&self) -> Result<QuestionBank, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::NotFound {
                path: self.path.clone(),
            });
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        if is_empty_document(&raw) {
            tracing::debug!(path = %self.path.display(), "empty document, starting a new bank");
            return Ok(QuestionBank::new(&self.img_dir)?);
        }

        let doc: BankDocument = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let bank = self.from_document(doc)?;

        tracing::info!(
            path = %self.path.display(),
            chapters = bank.list_chapters().len(),
            questions = bank.get_qid_list().len(),
            "question bank loaded"
        );
        Ok(bank)
    }
}

fn build_question(record: &QuestionRecord, img_path: Option<PathBuf>) -> Result<Question, crate::bank::BankError> {
    let mut question = Question::new(
        record.qid.as_str(),
        record.question.as_str(),
        record.answers.iter().map(String::as_str),
        record.correct_answer.as_str(),
        img_path,
    )?;
    question.set_tags(&record.tags)?;
    question.set_keywords(&record.keywords)?;
    Ok(question)
}

fn is_empty_document(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return true;
    }
    matches!(
        serde_json::from_str::<serde_json::Value>(trimmed),
        Ok(serde_json::Value::Object(map)) if map.is_empty()
    )
}

fn create_dir(path: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(path).map_err(|source| StoreError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
