use anyhow::{Context, Result};

use qbank::config::QbankConfig;
use qbank::store::Database;

/// Print chapter and question counts.
pub fn stats(config: &QbankConfig) -> Result<()> {
    let db = config.database();
    let bank = db.load().context("failed to load question bank")?;

    let total = bank.question_count(None)?;
    let with_img = bank.questions().filter(|q| q.has_img()).count();
    let labelled = bank.questions().filter(|q| !q.tags().is_empty()).count();

    println!("Question Bank Statistics");
    println!("{}", "=".repeat(40));
    println!("  Database:            {}", db.path().display());
    println!("  Images:              {}", bank.img_dir().display());
    println!("  Chapters:            {}", bank.list_chapters().len());
    println!("  Questions:           {total}");
    println!("  With image:          {with_img}");
    println!("  Text only:           {}", total - with_img);
    println!("  Labelled:            {labelled}");
    println!();

    if total > 0 {
        println!("By Chapter:");
        for chapter in bank.list_chapters() {
            println!(
                "  {:>4}  {:<28} {}",
                chapter,
                bank.describe_chapter(chapter)?,
                bank.question_count(Some(chapter))?
            );
        }
    }
    Ok(())
}
