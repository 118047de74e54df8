//! CLI `embed` command: encode every question and write the vectors as JSON.

use std::path::Path;

use anyhow::{Context, Result};

use qbank::config::QbankConfig;
use qbank::embedding;
use qbank::store::Database;

pub async fn embed(config: &QbankConfig, output: &Path) -> Result<()> {
    let bank = config
        .database()
        .load()
        .context("failed to load question bank")?;

    let total = bank.question_count(None)?;
    if total == 0 {
        println!("No questions to embed.");
        return Ok(());
    }

    let embedder = embedding::create_embedder(&config.embedding)
        .context("failed to create embedder")?;

    println!("Embedding {total} questions with model '{}'...", config.embedding.model);
    let pb = super::bar(total as u64, "  {bar:40.cyan/blue} {pos}/{len} ({eta})")?;

    let progress = pb.clone();
    let embeddings = tokio::task::spawn_blocking(move || {
        embedding::encode_bank_with(embedder.as_ref(), &bank, |_| progress.inc(1))
    })
    .await
    .context("embedding task panicked")??;
    pb.finish_and_clear();

    let json = serde_json::to_string(&embeddings).context("failed to serialize embeddings")?;
    std::fs::write(output, json)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} embeddings to {}", embeddings.len(), output.display());
    Ok(())
}
