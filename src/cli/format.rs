use std::path::Path;

use anyhow::{Context, Result};

use qbank::config::QbankConfig;
use qbank::imaging::DataFormatter;
use qbank::store::{Database, JsonDatabase};

/// Reshape every image in the configured bank into `img_dir` and save the
/// result as a new bank at `output_db`. The source bank is left untouched.
pub fn format(config: &QbankConfig, img_dir: &Path, output_db: &Path) -> Result<()> {
    let mut bank = config
        .database()
        .load()
        .context("failed to load question bank")?;

    let format = config.data_format()?;
    let (width, height) = format.size();
    println!(
        "Formatting {} questions to {width}x{height} .{}...",
        bank.question_count(None)?,
        format.output_extension()
    );

    let formatter = DataFormatter::new(format)?.with_padding(config.format.padding);
    let report = formatter
        .format(&mut bank, img_dir)
        .context("failed to format question bank")?;

    JsonDatabase::new(output_db, img_dir)
        .with_missing_image_policy(config.storage.missing_image)
        .save(&bank)
        .context("failed to save formatted question bank")?;

    println!("  Reshaped:   {}", report.reshaped);
    println!("  Text only:  {}", report.text_only);
    println!("Saved formatted bank to {}", output_db.display());
    Ok(())
}
