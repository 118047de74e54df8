//! CLI `label` commands: build the batch request file and apply batch results.

use std::path::Path;

use anyhow::{Context, Result};

use qbank::config::QbankConfig;
use qbank::labeling::{BatchRequestFactory, LabelFactory, RequestFactory, ResponseParsingPipeline};
use qbank::store::Database;

/// Write one JSONL request line per question.
pub fn request(config: &QbankConfig, output: &Path) -> Result<()> {
    let bank = config
        .database()
        .load()
        .context("failed to load question bank")?;

    let prompt = config.labeling_prompt()?;
    let factory = RequestFactory::new(&config.labeling.url, &config.labeling.model, prompt)?;
    let batch = BatchRequestFactory::new(factory)
        .make_batch_request(&bank)
        .context("failed to build labeling requests")?;

    batch.write_jsonl(output)?;
    println!("Wrote {} requests to {}", batch.len(), output.display());
    Ok(())
}

/// Parse a batch result file, set tags and keywords, save the bank.
pub fn apply(config: &QbankConfig, results: &Path) -> Result<()> {
    let db = config.database();
    let mut bank = db.load().context("failed to load question bank")?;

    let pipeline = ResponseParsingPipeline::new(LabelFactory::new(config.message_format()?));
    let labels = pipeline
        .parse_file(results)
        .with_context(|| format!("failed to parse {}", results.display()))?;
    let applied = pipeline.apply(&mut bank, &labels)?;

    db.save(&bank).context("failed to save question bank")?;
    println!("Applied labels to {applied} questions");
    Ok(())
}
