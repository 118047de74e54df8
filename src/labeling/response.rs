//! Typed batch result lines.
//!
//! Each line of a batch output file decodes into a [`BatchResponse`]; decoding
//! only checks shape, [`BatchResponse::validate`] checks the semantic rules
//! and reports the dotted path of the first offending field.

use serde::Deserialize;

use super::LabelError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchResponse {
    pub id: String,
    pub custom_id: String,
    pub response: ResponseData,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseData {
    pub status_code: u16,
    pub request_id: String,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseBody {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Choice {
    pub index: u32,
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl BatchResponse {
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Messages of every choice, in index order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.response.body.choices.iter().map(|c| &c.message)
    }

    pub fn validate(&self) -> Result<(), LabelError> {
        let fail = |field: &str, reason: String| LabelError::InvalidResponse {
            custom_id: self.custom_id.clone(),
            field: field.to_string(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(fail("id", "must be non-empty".into()));
        }
        if self.custom_id.trim().is_empty() {
            return Err(fail("custom_id", "must be non-empty".into()));
        }

        let data = &self.response;
        if !(200..=599).contains(&data.status_code) {
            return Err(fail(
                "response.status_code",
                format!("{} is outside 200..=599", data.status_code),
            ));
        }
        if data.status_code >= 400 {
            let detail = self
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(fail(
                "response.status_code",
                format!("request failed with status {}: {detail}", data.status_code),
            ));
        }
        if data.request_id.trim().is_empty() {
            return Err(fail("response.request_id", "must be non-empty".into()));
        }

        let body = &data.body;
        if body.id.trim().is_empty() {
            return Err(fail("response.body.id", "must be non-empty".into()));
        }
        if body.model.trim().is_empty() {
            return Err(fail("response.body.model", "must be non-empty".into()));
        }
        if body.created <= 0 {
            return Err(fail("response.body.created", format!("{} is not a timestamp", body.created)));
        }
        if body.choices.is_empty() {
            return Err(fail("response.body.choices", "must contain at least one choice".into()));
        }

        for (position, choice) in body.choices.iter().enumerate() {
            let at = |field: &str| format!("response.body.choices[{position}].{field}");
            if choice.index as usize != position {
                return Err(fail(
                    &at("index"),
                    format!("expected {position}, got {}; indices must be sequential from 0", choice.index),
                ));
            }
            if choice.message.role != "assistant" {
                return Err(fail(
                    &at("message.role"),
                    format!("expected \"assistant\", got {:?}", choice.message.role),
                ));
            }
            if choice.message.content.trim().is_empty() {
                return Err(fail(&at("message.content"), "must be non-empty".into()));
            }
        }

        let usage = body.usage;
        if usage.prompt_tokens.checked_add(usage.completion_tokens) != Some(usage.total_tokens) {
            return Err(fail(
                "response.body.usage.total_tokens",
                format!(
                    "{} != prompt_tokens {} + completion_tokens {}",
                    usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
                ),
            ));
        }
        Ok(())
    }
}
