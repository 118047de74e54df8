use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::imaging::{DataFormat, PADDING_GRAY};
use crate::labeling::MessageFormat;
use crate::store::{ImagePolicy, JsonDatabase, MissingImagePolicy};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct QbankConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub format: FormatConfig,
    pub embedding: EmbeddingConfig,
    pub labeling: LabelingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub img_dir: String,
    pub image_policy: ImagePolicy,
    pub missing_image: MissingImagePolicy,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FormatConfig {
    pub width: u32,
    pub height: u32,
    pub input_extension: Option<String>,
    pub output_extension: String,
    pub padding: [u8; 3],
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    /// Hugging Face repository the model files are fetched from.
    pub repo: String,
    pub cache_dir: String,
    pub max_length: usize,
    pub image_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LabelingConfig {
    pub url: String,
    pub model: String,
    /// System prompt. Ignored when `prompt_file` is set.
    pub prompt: String,
    pub prompt_file: Option<String>,
    pub start_tag: String,
    pub end_tag: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_qbank_dir();
        Self {
            db_path: dir.join("qbank.json").to_string_lossy().into_owned(),
            img_dir: dir.join("images").to_string_lossy().into_owned(),
            image_policy: ImagePolicy::default(),
            missing_image: MissingImagePolicy::default(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            input_extension: None,
            output_extension: "jpg".into(),
            padding: PADDING_GRAY,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_qbank_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "siglip2-base-patch16-256".into(),
            repo: "onnx-community/siglip2-base-patch16-256-ONNX".into(),
            cache_dir,
            max_length: 64,
            image_size: 256,
        }
    }
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            url: crate::labeling::request::DEFAULT_URL.into(),
            model: "qwen-vl-max".into(),
            prompt: "Read the driving-test question (and image, if any). Reply with a JSON object \
                     {\"keywords\": [...], \"tags\": [...]} wrapped in <JSON></JSON>."
                .into(),
            prompt_file: None,
            start_tag: crate::labeling::labels::DEFAULT_START_TAG.into(),
            end_tag: crate::labeling::labels::DEFAULT_END_TAG.into(),
        }
    }
}

/// Returns `~/.qbank/`, or `./.qbank/` when there is no home directory.
pub fn default_qbank_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".qbank")
}

/// Returns the default config file path: `~/.qbank/config.toml`
pub fn default_config_path() -> PathBuf {
    default_qbank_dir().join("config.toml")
}

impl QbankConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            QbankConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (QBANK_DB, QBANK_IMG_DIR, QBANK_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("QBANK_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("QBANK_IMG_DIR") {
            self.storage.img_dir = val;
        }
        if let Ok(val) = std::env::var("QBANK_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_img_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.img_dir)
    }

    /// The JSON store described by `[storage]`.
    pub fn database(&self) -> JsonDatabase {
        JsonDatabase::new(self.resolved_db_path(), self.resolved_img_dir())
            .with_image_policy(self.storage.image_policy.clone())
            .with_missing_image_policy(self.storage.missing_image)
    }

    pub fn data_format(&self) -> Result<DataFormat> {
        let f = &self.format;
        DataFormat::new(f.width, f.height, f.input_extension.as_deref(), &f.output_extension)
            .context("invalid [format] section")
    }

    pub fn message_format(&self) -> Result<MessageFormat> {
        MessageFormat::new(&self.labeling.start_tag, &self.labeling.end_tag)
            .context("invalid [labeling] tags")
    }

    /// The labeling system prompt, read from `prompt_file` when set.
    pub fn labeling_prompt(&self) -> Result<String> {
        match &self.labeling.prompt_file {
            Some(file) => {
                let path = expand_tilde(file);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read prompt file {}", path.display()))
            }
            None => Ok(self.labeling.prompt.clone()),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = QbankConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.storage.db_path.ends_with("qbank.json"));
        assert!(config.storage.img_dir.ends_with("images"));
        assert_eq!(config.storage.image_policy, ImagePolicy::Preserve);
        assert_eq!(config.storage.missing_image, MissingImagePolicy::Error);
        assert_eq!(config.format.padding, [127, 127, 127]);
        assert_eq!(config.embedding.max_length, 64);
        assert!(config.data_format().is_ok());
        assert!(config.message_format().is_ok());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[logging]
level = "debug"

[storage]
db_path = "/tmp/test.json"
missing_image = "drop"

[storage.image_policy]
mode = "convert"
extension = "webp"

[format]
width = 400
height = 300
input_extension = "png"
"#;
        let config: QbankConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.json");
        assert_eq!(config.storage.missing_image, MissingImagePolicy::Drop);
        assert_eq!(
            config.storage.image_policy,
            ImagePolicy::Convert {
                extension: "webp".into()
            }
        );
        assert_eq!(config.format.width, 400);
        assert_eq!(config.format.input_extension.as_deref(), Some("png"));
        // defaults still apply for unset fields
        assert_eq!(config.format.output_extension, "jpg");
        assert!(config.storage.img_dir.ends_with("images"));
    }

    #[test]
    fn invalid_sections_are_reported() {
        let mut config = QbankConfig::default();
        config.format.width = 10;
        assert!(config.data_format().is_err());

        config.labeling.end_tag = config.labeling.start_tag.clone();
        assert!(config.message_format().is_err());
    }

    #[test]
    fn prompt_file_overrides_inline_prompt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("prompt.txt");
        std::fs::write(&file, "from file").unwrap();

        let mut config = QbankConfig::default();
        assert_eq!(config.labeling_prompt().unwrap(), config.labeling.prompt);

        config.labeling.prompt_file = Some(file.to_string_lossy().into_owned());
        assert_eq!(config.labeling_prompt().unwrap(), "from file");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = QbankConfig::default();
        std::env::set_var("QBANK_DB", "/tmp/override.json");
        std::env::set_var("QBANK_IMG_DIR", "/tmp/override-imgs");
        std::env::set_var("QBANK_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.json");
        assert_eq!(config.storage.img_dir, "/tmp/override-imgs");
        assert_eq!(config.logging.level, "trace");

        // Clean up
        std::env::remove_var("QBANK_DB");
        std::env::remove_var("QBANK_IMG_DIR");
        std::env::remove_var("QBANK_LOG_LEVEL");
    }

    #[test]
    fn tilde_expansion() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x.json"), home.join("x.json"));
        }
    }
}
