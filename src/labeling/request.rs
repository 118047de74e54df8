//! Batch labeling requests in the OpenAI-compatible JSONL format.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::bank::{Question, QuestionBank};
use crate::imaging::mime_type;

use super::LabelError;

pub const DEFAULT_URL: &str = "/v1/chat/completions";
const METHOD: &str = "POST";
const PROGRESS_EVERY: usize = 100;

/// One part of the user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// A single JSONL line of a batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelingRequest {
    pub custom_id: String,
    pub method: &'static str,
    pub url: String,
    pub body: RequestBody,
}

impl LabelingRequest {
    pub fn to_json_line(&self) -> Result<String, LabelError> {
        serde_json::to_string(self).map_err(|source| LabelError::Serialize {
            custom_id: self.custom_id.clone(),
            source,
        })
    }

    /// The user message parts.
    pub fn content(&self) -> &[ContentPart] {
        self.body
            .messages
            .iter()
            .find_map(|m| match &m.content {
                MessageContent::Parts(parts) if m.role == "user" => Some(parts.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Text block sent to the model. Field names are the keys the labeling
/// prompt refers to.
#[derive(Debug, Serialize)]
struct QuestionPrompt<'a> {
    #[serde(rename = "章节")]
    chapter: String,
    #[serde(rename = "题目")]
    question: &'a str,
    #[serde(rename = "选项")]
    choices: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "答案")]
    answer: &'a str,
}

/// Builds a [`LabelingRequest`] per question.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    url: String,
    model: String,
    prompt: String,
}

impl RequestFactory {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Result<Self, LabelError> {
        let url = non_empty(url.into(), "url")?;
        let model = non_empty(model.into(), "model")?;
        let prompt = non_empty(prompt.into(), "prompt")?;
        Ok(Self { url, model, prompt })
    }

    /// Request for `question`, keyed by its qid.
    pub fn make_request(&self, question: &Question) -> Result<LabelingRequest, LabelError> {
        let mut parts = Vec::with_capacity(2);
        if let Some(path) = question.img_path() {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: encode_image(question.qid(), path)?,
                },
            });
        }
        parts.push(ContentPart::Text {
            text: format_text(question)?,
        });

        tracing::debug!(qid = %question.qid(), parts = parts.len(), "labeling request built");
        Ok(LabelingRequest {
            custom_id: question.qid().to_string(),
            method: METHOD,
            url: self.url.clone(),
            body: RequestBody {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: MessageContent::Text(self.prompt.clone()),
                    },
                    ChatMessage {
                        role: "user",
                        content: MessageContent::Parts(parts),
                    },
                ],
            },
        })
    }
}

/// A batch of requests, one per question.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    requests: Vec<LabelingRequest>,
}

impl BatchRequest {
    pub fn requests(&self) -> &[LabelingRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn to_jsonl(&self) -> Result<String, LabelError> {
        let mut out = String::new();
        for request in &self.requests {
            out.push_str(&request.to_json_line()?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn write_jsonl(&self, path: &Path) -> Result<(), LabelError> {
        let body = self.to_jsonl()?;
        std::fs::write(path, body).map_err(|source| LabelError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Walks a whole bank through a [`RequestFactory`].
#[derive(Debug, Clone)]
pub struct BatchRequestFactory {
    factory: RequestFactory,
}

impl BatchRequestFactory {
    pub fn new(factory: RequestFactory) -> Self {
        Self { factory }
    }

    pub fn make_batch_request(&self, bank: &QuestionBank) -> Result<BatchRequest, LabelError> {
        let qids = bank.get_qid_list();
        let total = qids.len();
        tracing::info!(total, "building labeling batch");

        let mut requests = Vec::with_capacity(total);
        for (processed, qid) in qids.iter().enumerate() {
            if processed % PROGRESS_EVERY == 0 {
                tracing::info!(processed, total, "building labeling batch");
            }
            requests.push(self.factory.make_request(bank.get_question(qid)?)?);
        }

        tracing::info!(requests = requests.len(), "labeling batch ready");
        Ok(BatchRequest { requests })
    }
}

fn non_empty(value: String, field: &'static str) -> Result<String, LabelError> {
    if value.trim().is_empty() {
        return Err(LabelError::EmptyField { field });
    }
    Ok(value)
}

/// `data:{mime};base64,{payload}` for the image file at `path`.
pub fn encode_image(qid: &str, path: &Path) -> Result<String, LabelError> {
    let bytes = std::fs::read(path).map_err(|source| LabelError::ImageRead {
        qid: qid.to_string(),
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
    Ok(format!("data:{};base64,{}", mime_type(ext), STANDARD.encode(bytes)))
}

/// Answers sorted ascending, lettered `A`, `B`, ...
pub fn letter_choices(question: &Question) -> Result<Vec<(char, &str)>, LabelError> {
    let answers = question.answers();
    if answers.len() > 26 {
        return Err(LabelError::TooManyAnswers {
            qid: question.qid().to_string(),
            count: answers.len(),
        });
    }
    Ok((b'A'..=b'Z')
        .map(char::from)
        .zip(answers.iter().map(String::as_str))
        .collect())
}

fn format_text(question: &Question) -> Result<String, LabelError> {
    let chapter = question.chapter().ok_or_else(|| LabelError::MissingChapter {
        qid: question.qid().to_string(),
    })?;

    let choices = letter_choices(question)?
        .into_iter()
        .map(|(letter, answer)| (letter.to_string(), serde_json::Value::from(answer)))
        .collect();

    let prompt = QuestionPrompt {
        chapter: chapter.to_string(),
        question: question.question(),
        choices,
        answer: question.correct_answer(),
    };
    serde_json::to_string(&prompt).map_err(|source| LabelError::Serialize {
        custom_id: question.qid().to_string(),
        source,
    })
}
