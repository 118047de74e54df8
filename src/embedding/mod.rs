//! Question embedding.
//!
//! Provides the [`QuestionEmbedder`] trait, the text layout fed to it
//! ([`format_question`]) and [`encode_bank`], which walks a whole
//! [`QuestionBank`] chapter by chapter. The local implementation is a
//! SigLIP-style dual encoder run with ONNX Runtime; create it via
//! [`create_embedder`] from configuration.

pub mod local;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use image::DynamicImage;

use crate::bank::{Question, QuestionBank};
use crate::imaging::load_image;

/// Number of dimensions in the embedding vectors (SigLIP2 base).
pub const EMBEDDING_DIM: usize = 768;

/// Joint text/image embedder.
///
/// Implementations return L2-normalized vectors of [`dimensions`](Self::dimensions)
/// length. With an image, the result combines the text and image embeddings.
/// All methods are synchronous; callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait QuestionEmbedder: Send + Sync {
    fn encode(&self, text: &str, image: Option<&DynamicImage>) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Text layout used for every question.
pub fn format_question(question: &Question, chapter_description: &str) -> String {
    format!(
        "chapter: {chapter_description}\nquestion: {}\nanswer: {}",
        question.question(),
        question.correct_answer()
    )
}

/// Embed every question of `bank`, walking chapters in ascending order.
///
/// Question images are read from disk; a missing or undecodable image fails
/// the whole run.
pub fn encode_bank(embedder: &dyn QuestionEmbedder, bank: &QuestionBank) -> Result<BTreeMap<String, Vec<f32>>> {
    encode_bank_with(embedder, bank, |_| {})
}

/// [`encode_bank`] with a callback invoked after each question (for progress
/// reporting).
pub fn encode_bank_with(
    embedder: &dyn QuestionEmbedder,
    bank: &QuestionBank,
    mut on_question: impl FnMut(&str),
) -> Result<BTreeMap<String, Vec<f32>>> {
    let mut embeddings = BTreeMap::new();

    for chapter in bank.list_chapters() {
        let description = bank.describe_chapter(chapter)?;
        tracing::info!(chapter, "encoding chapter");

        for qid in bank.get_qids_by_chapter(chapter)? {
            let question = bank.get_question(&qid)?;
            let image = question
                .img_path()
                .map(load_image)
                .transpose()
                .with_context(|| format!("failed to load image for question {qid}"))?;

            let text = format_question(question, description);
            let vector = embedder
                .encode(&text, image.as_ref())
                .with_context(|| format!("failed to embed question {qid}"))?;
            anyhow::ensure!(
                vector.len() == embedder.dimensions(),
                "embedder returned {} dimensions for {qid}, expected {}",
                vector.len(),
                embedder.dimensions()
            );

            tracing::debug!(qid = %qid, has_img = image.is_some(), "question encoded");
            on_question(&qid);
            embeddings.insert(qid, vector);
        }
    }

    tracing::info!(questions = embeddings.len(), "finished encoding question bank");
    Ok(embeddings)
}

/// Create an embedder from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + SigLIP2).
/// Returns an error if model files are not found; run `qbank model download` first.
pub fn create_embedder(config: &crate::config::EmbeddingConfig) -> Result<Box<dyn QuestionEmbedder>> {
    match config.provider.as_str() {
        "local" => {
            let embedder = local::LocalEmbedder::new(config)?;
            Ok(Box::new(embedder))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::TempDir;

    /// Deterministic fake: first slot holds the text length, second flags an image.
    struct Fake;

    impl QuestionEmbedder for Fake {
        fn encode(&self, text: &str, image: Option<&DynamicImage>) -> Result<Vec<f32>> {
            let mut v = vec![0.0; 4];
            v[0] = text.len() as f32;
            v[1] = if image.is_some() { 1.0 } else { 0.0 };
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    fn question(qid: &str, img: Option<std::path::PathBuf>) -> Question {
        Question::new(qid, "Which lane?", ["Left", "Right"], "Left", img).unwrap()
    }

    #[test]
    fn formats_chapter_question_answer() {
        let text = format_question(&question("q1", None), "Lanes");
        assert_eq!(text, "chapter: Lanes\nquestion: Which lane?\nanswer: Left");
    }

    #[test]
    fn encodes_every_question_with_images() {
        let tmp = TempDir::new().unwrap();
        let img_path = tmp.path().join("q2.png");
        RgbImage::new(8, 8).save(&img_path).unwrap();

        let mut bank = QuestionBank::new(tmp.path()).unwrap();
        bank.add_chapter(2, "Lanes").unwrap();
        bank.add_chapter(1, "Signs").unwrap();
        bank.add_question(question("q1", None), 2).unwrap();
        bank.add_question(question("q2", Some(img_path)), 1).unwrap();

        let mut order = Vec::new();
        let out = encode_bank_with(&Fake, &bank, |qid| order.push(qid.to_string())).unwrap();
        assert_eq!(order, ["q2", "q1"]);
        assert_eq!(out.len(), 2);
        assert_eq!(out["q2"][1], 1.0);
        assert_eq!(out["q1"][1], 0.0);
    }

    #[test]
    fn missing_image_fails_the_run() {
        let tmp = TempDir::new().unwrap();
        let mut bank = QuestionBank::new(tmp.path()).unwrap();
        bank.add_chapter(1, "Signs").unwrap();
        bank.add_question(question("q1", Some(tmp.path().join("gone.png"))), 1)
            .unwrap();
        let err = encode_bank(&Fake, &bank).unwrap_err();
        assert!(format!("{err:#}").contains("q1"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = crate::config::EmbeddingConfig {
            provider: "remote".into(),
            ..Default::default()
        };
        assert!(create_embedder(&config).is_err());
    }
}
