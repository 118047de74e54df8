use std::collections::BTreeMap;
use std::path::Path;

use crate::bank::QuestionBank;

use super::labels::{LabelData, LabelFactory};
use super::response::BatchResponse;
use super::LabelError;

/// Reads a batch result file and writes the labels back onto a bank.
#[derive(Debug, Clone, Default)]
pub struct ResponseParsingPipeline {
    factory: LabelFactory,
}

impl ResponseParsingPipeline {
    pub fn new(factory: LabelFactory) -> Self {
        Self { factory }
    }

    /// Decode and validate every non-blank line of `path`, then collect labels
    /// per `custom_id`. Labels from several choices or several lines with the
    /// same id are merged.
    pub fn parse_file(&self, path: &Path) -> Result<BTreeMap<String, LabelData>, LabelError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LabelError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut labels: BTreeMap<String, LabelData> = BTreeMap::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let response = BatchResponse::from_json(line).map_err(|source| LabelError::Decode {
                path: path.to_path_buf(),
                line: number + 1,
                source,
            })?;
            response.validate()?;

            let entry = labels.entry(response.custom_id.clone()).or_default();
            for message in response.messages() {
                entry.extend(&self.factory.make_label_data(message)?);
            }
        }

        tracing::info!(path = %path.display(), questions = labels.len(), "parsed labeling responses");
        Ok(labels)
    }

    /// Replace tags and keywords on every labelled question. Every qid is
    /// checked before anything is written, so an unknown qid leaves the bank
    /// untouched.
    pub fn apply(&self, bank: &mut QuestionBank, labels: &BTreeMap<String, LabelData>) -> Result<usize, LabelError> {
        if let Some(unknown) = labels.keys().find(|qid| bank.get_question(qid).is_err()) {
            return Err(LabelError::UnknownQuestion(unknown.clone()));
        }

        for (qid, data) in labels {
            bank.set_question_labels(qid, data.tags(), data.keywords())?;
            tracing::debug!(qid = %qid, tags = data.tags().len(), keywords = data.keywords().len(), "labels applied");
        }
        Ok(labels.len())
    }

    /// [`parse_file`](Self::parse_file) then [`apply`](Self::apply).
    pub fn parse_and_apply(&self, bank: &mut QuestionBank, path: &Path) -> Result<usize, LabelError> {
        let labels = self.parse_file(path)?;
        self.apply(bank, &labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Question;
    use crate::labeling::response::tests::line;
    use tempfile::TempDir;

    fn bank(tmp: &TempDir) -> QuestionBank {
        let mut qb = QuestionBank::new(tmp.path()).unwrap();
        qb.add_chapter(1, "Signs").unwrap();
        for qid in ["q1", "q2"] {
            let q = Question::new(qid, "x?", ["a", "b"], "a", None).unwrap();
            qb.add_question(q, 1).unwrap();
        }
        qb
    }

    fn write(tmp: &TempDir, lines: &[String]) -> std::path::PathBuf {
        let path = tmp.path().join("results.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn merges_choices_and_lines_per_question() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            &[
                line(
                    "q1",
                    &[
                        r#"<JSON>{"keywords": ["stop"], "tags": ["signs"]}</JSON>"#,
                        r#"<JSON>{"keywords": ["stop", "red"], "tags": []}</JSON>"#,
                    ],
                ),
                String::new(),
                line("q1", &[r#"<JSON>{"tags": ["signs", "prohibitions"]}</JSON>"#]),
                line("q2", &[r#"<JSON>{"keywords": ["lane"]}</JSON>"#]),
            ],
        );

        let labels = ResponseParsingPipeline::default().parse_file(&path).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["q1"].keywords(), ["stop", "red"]);
        assert_eq!(labels["q1"].tags(), ["signs", "prohibitions"]);
        assert_eq!(labels["q2"].keywords(), ["lane"]);
    }

    #[test]
    fn apply_sets_labels() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        let path = write(&tmp, &[line("q2", &[r#"<JSON>{"keywords": ["k"], "tags": ["t"]}</JSON>"#])]);

        let applied = ResponseParsingPipeline::default().parse_and_apply(&mut qb, &path).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(qb.get_question("q2").unwrap().tags(), ["t"]);
        assert_eq!(qb.get_question("q2").unwrap().keywords(), ["k"]);
        assert!(qb.get_question("q1").unwrap().tags().is_empty());
    }

    #[test]
    fn unknown_question_leaves_bank_untouched() {
        let tmp = TempDir::new().unwrap();
        let mut qb = bank(&tmp);
        let mut labels = BTreeMap::new();
        labels.insert("q1".to_string(), LabelData::new(["k"], ["t"]));
        labels.insert("zz".to_string(), LabelData::new(["k"], ["t"]));

        let err = ResponseParsingPipeline::default().apply(&mut qb, &labels).unwrap_err();
        assert!(matches!(err, LabelError::UnknownQuestion(ref q) if q == "zz"));
        assert!(qb.get_question("q1").unwrap().tags().is_empty());
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, &[line("q1", &["<JSON>{}</JSON>"]), "{not json".to_string()]);
        let err = ResponseParsingPipeline::default().parse_file(&path).unwrap_err();
        assert!(matches!(err, LabelError::Decode { line: 2, .. }));
    }

    #[test]
    fn message_without_tags_fails() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, &[line("q1", &["no tags here"])]);
        let err = ResponseParsingPipeline::default().parse_file(&path).unwrap_err();
        assert!(matches!(err, LabelError::MissingTags { .. }));
    }
}
