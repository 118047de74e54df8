use anyhow::{Context, Result};

use qbank::config::QbankConfig;

/// Create the database file (as `{}`) and image directory if missing.
pub fn init(config: &QbankConfig) -> Result<()> {
    let db = config.database();
    let created = db.init().context("failed to initialise question bank")?;

    if created {
        println!("Created empty question bank at {}", db.path().display());
    } else {
        println!("Question bank already exists at {}", db.path().display());
    }
    println!("Images directory: {}", db.img_dir().display());
    Ok(())
}
