use std::path::Path;

use anyhow::{Context, Result};

use qbank::imaging::ImageReshaper;

pub struct ReshapeArgs<'a> {
    pub name: &'a str,
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub input_extension: &'a str,
    pub output_extension: &'a str,
    pub width: u32,
    pub height: u32,
    pub padding: [u8; 3],
}

/// Reshape a single image file.
pub fn reshape(args: ReshapeArgs<'_>) -> Result<()> {
    let reshaper = ImageReshaper::new(args.width, args.height)?.with_padding(args.padding);
    let output = reshaper
        .reshape(
            args.name,
            args.input_dir,
            args.output_dir,
            args.input_extension,
            args.output_extension,
        )
        .with_context(|| format!("failed to reshape {}", args.name))?;

    println!("Wrote {}x{} image to {}", args.width, args.height, output.display());
    Ok(())
}
