pub mod embed;
pub mod format;
pub mod init;
pub mod label;
pub mod reshape;
pub mod stats;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use qbank::config::EmbeddingConfig;
use qbank::embedding::local::{TEXT_MODEL_FILE, TOKENIZER_FILE, VISION_MODEL_FILE};

/// (path inside the Hugging Face repo, file name in the cache directory)
const MODEL_FILES: [(&str, &str); 3] = [
    ("onnx/text_model.onnx", TEXT_MODEL_FILE),
    ("onnx/vision_model.onnx", VISION_MODEL_FILE),
    ("tokenizer.json", TOKENIZER_FILE),
];

/// Download the ONNX text/vision encoders and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let cache_dir = qbank::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    for (remote, local) in MODEL_FILES {
        let dest = cache_dir.join(local);
        if dest.exists() {
            println!("{local} already exists at {}", dest.display());
            continue;
        }
        let url = format!("https://huggingface.co/{}/resolve/main/{remote}", config.repo);
        println!("Downloading {local} from {}...", config.repo);
        download_file(&url, &dest).await?;
        println!("{local} saved to {}", dest.display());
    }

    println!("Model download complete. Ready for use.");
    Ok(())
}

/// Bar style shared by downloads and long-running commands.
pub fn bar(len: u64, template: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .context("invalid progress template")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// Download a file from a URL with progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download of {url} failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => bar(size, "  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")?,
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
