use serde::Deserialize;

use super::response::Message;
use super::LabelError;

pub const DEFAULT_START_TAG: &str = "<JSON>";
pub const DEFAULT_END_TAG: &str = "</JSON>";

/// Delimiters around the JSON payload in a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormat {
    start_tag: String,
    end_tag: String,
}

impl MessageFormat {
    pub fn new(start_tag: impl Into<String>, end_tag: impl Into<String>) -> Result<Self, LabelError> {
        let start_tag = start_tag.into();
        let end_tag = end_tag.into();
        if start_tag.is_empty() {
            return Err(LabelError::EmptyField { field: "start tag" });
        }
        if end_tag.is_empty() {
            return Err(LabelError::EmptyField { field: "end tag" });
        }
        if start_tag == end_tag {
            return Err(LabelError::SameTags { tag: start_tag });
        }
        Ok(Self { start_tag, end_tag })
    }

    pub fn start_tag(&self) -> &str {
        &self.start_tag
    }

    pub fn end_tag(&self) -> &str {
        &self.end_tag
    }
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self {
            start_tag: DEFAULT_START_TAG.to_string(),
            end_tag: DEFAULT_END_TAG.to_string(),
        }
    }
}

/// Keywords and tags for one question. Both lists keep first-seen order and
/// never hold duplicates or blank entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelData {
    keywords: Vec<String>,
    tags: Vec<String>,
}

impl LabelData {
    pub fn new<K, T>(keywords: K, tags: T) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let mut data = Self::default();
        data.add_keywords(keywords);
        data.add_tags(tags);
        data
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn add_keywords<I>(&mut self, keywords: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        merge(&mut self.keywords, keywords);
    }

    pub fn add_tags<I>(&mut self, tags: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        merge(&mut self.tags, tags);
    }

    pub fn extend(&mut self, other: &LabelData) {
        self.add_keywords(&other.keywords);
        self.add_tags(&other.tags);
    }
}

fn merge<I>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for item in items {
        let label = item.as_ref().trim();
        if !label.is_empty() && !target.iter().any(|t| t == label) {
            target.push(label.to_string());
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLabels {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Turns assistant messages into [`LabelData`].
#[derive(Debug, Clone, Default)]
pub struct LabelFactory {
    format: MessageFormat,
}

impl LabelFactory {
    pub fn new(format: MessageFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &MessageFormat {
        &self.format
    }

    pub fn make_label_data(&self, message: &Message) -> Result<LabelData, LabelError> {
        let json = self.extract_json(&message.content)?;
        Self::parse_output(json)
    }

    /// Trimmed text between the single start tag and the single end tag.
    pub fn extract_json<'a>(&self, content: &'a str) -> Result<&'a str, LabelError> {
        let start_tag = self.format.start_tag();
        let end_tag = self.format.end_tag();

        let (Some(start), Some(end)) = (content.find(start_tag), content.find(end_tag)) else {
            return Err(LabelError::MissingTags {
                start: start_tag.to_string(),
                end: end_tag.to_string(),
            });
        };
        if content.matches(start_tag).count() > 1 || content.matches(end_tag).count() > 1 {
            return Err(LabelError::MultipleTags);
        }
        let inner_start = start + start_tag.len();
        if inner_start > end {
            return Err(LabelError::TagOrder);
        }
        Ok(content[inner_start..end].trim())
    }

    /// Parse `{"keywords": [...], "tags": [...]}`. Missing lists default to
    /// empty and unknown fields are ignored.
    pub fn parse_output(json: &str) -> Result<LabelData, LabelError> {
        let raw: RawLabels = serde_json::from_str(json).map_err(LabelError::InvalidJson)?;
        Ok(LabelData::new(raw.keywords, raw.tags))
    }
}
