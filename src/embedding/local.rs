//! Local ONNX Runtime embedder.
//!
//! Implements [`QuestionEmbedder`] with the separate text and vision towers of
//! a SigLIP2 export via `ort`. Handles tokenization, image preprocessing,
//! inference, text/image fusion, and L2 normalization.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tokenizers::Tokenizer;

use super::{QuestionEmbedder, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// Files expected in the model cache directory.
pub const TEXT_MODEL_FILE: &str = "text_model.onnx";
pub const VISION_MODEL_FILE: &str = "vision_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Local ONNX-based SigLIP2 embedder.
pub struct LocalEmbedder {
    text_session: Mutex<Session>,
    vision_session: Mutex<Session>,
    tokenizer: Tokenizer,
    image_size: u32,
}

// Safety: Tokenizer is Send+Sync. Both sessions sit behind a Mutex, which
// guarantees exclusive access during run().
unsafe impl Send for LocalEmbedder {}
unsafe impl Sync for LocalEmbedder {}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let text_path = cache_dir.join(TEXT_MODEL_FILE);
        let vision_path = cache_dir.join(VISION_MODEL_FILE);
        let tokenizer_path = cache_dir.join(TOKENIZER_FILE);

        for path in [&text_path, &vision_path, &tokenizer_path] {
            anyhow::ensure!(
                path.exists(),
                "{} not found. Run `qbank model download` first.",
                path.display()
            );
        }

        let text_session = open_session(&text_path)?;
        let vision_session = open_session(&vision_path)?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        // SigLIP is trained on fixed-length, max-padded text.
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::Fixed(config.max_length),
            ..Default::default()
        }));

        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            text_session: Mutex::new(text_session),
            vision_session: Mutex::new(vision_session),
            tokenizer,
            image_size: config.image_size,
        })
    }

    fn encode_text(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let shape = vec![1_i64, ids.len() as i64];
        let input_ids = Tensor::from_array((shape, ids.into_boxed_slice()))?;

        let mut session = self
            .text_session
            .lock()
            .map_err(|e| anyhow::anyhow!("text session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! { "input_ids" => input_ids })?;
        let value = outputs
            .get("text_embeds")
            .or_else(|| outputs.get("pooler_output"))
            .context("text model produced neither text_embeds nor pooler_output")?;
        pooled(value)
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let pixels = pixel_values(image, self.image_size);
        let side = self.image_size as i64;
        let shape = vec![1_i64, 3, side, side];
        let pixel_values = Tensor::from_array((shape, pixels.into_boxed_slice()))?;

        let mut session = self
            .vision_session
            .lock()
            .map_err(|e| anyhow::anyhow!("vision session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! { "pixel_values" => pixel_values })?;
        let value = outputs
            .get("image_embeds")
            .or_else(|| outputs.get("pooler_output"))
            .context("vision model produced neither image_embeds nor pooler_output")?;
        pooled(value)
    }
}

impl QuestionEmbedder for LocalEmbedder {
    fn encode(&self, text: &str, image: Option<&DynamicImage>) -> Result<Vec<f32>> {
        let text_embedding = self.encode_text(text)?;
        let combined = match image {
            Some(image) => {
                let image_embedding = self.encode_image(image)?;
                mean(&text_embedding, &image_embedding)
            }
            None => text_embedding,
        };
        Ok(l2_normalize(&combined))
    }
}

fn open_session(path: &Path) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .commit_from_file(path)
        .with_context(|| format!("failed to load ONNX model {}", path.display()))?;
    tracing::info!(model = %path.display(), "ONNX model loaded");
    Ok(session)
}

/// Copy out a pooled `[1, EMBEDDING_DIM]` output. The output name varies by
/// export, so callers try the projection name first, then `pooler_output`.
fn pooled(value: &DynValue) -> Result<Vec<f32>> {
    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .context("failed to extract embedding tensor")?;

    first_row(&shape, data)
}

/// The first `EMBEDDING_DIM` values of a `[n >= 1, EMBEDDING_DIM]` tensor.
fn first_row(dims: &[i64], data: &[f32]) -> Result<Vec<f32>> {
    anyhow::ensure!(
        dims.len() == 2 && dims[0] >= 1 && dims[1] == EMBEDDING_DIM as i64,
        "unexpected embedding shape: {dims:?}, expected [1, {EMBEDDING_DIM}]"
    );
    data.get(..EMBEDDING_DIM)
        .map(<[f32]>::to_vec)
        .with_context(|| format!("embedding tensor holds {} values, expected {EMBEDDING_DIM}", data.len()))
}

/// Resize to `size` x `size`, scale to `[-1, 1]`, lay out as CHW.
fn pixel_values(image: &DynamicImage, size: u32) -> Vec<f32> {
    let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let plane = (size * size) as usize;
    let mut out = vec![0.0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = f32::from(pixel[c]) / 127.5 - 1.0;
        }
    }
    out
}

fn mean(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect()
}

/// L2-normalize a vector. Returns a zero vector if the input norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
