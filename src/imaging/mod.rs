//! Image normalisation.
//!
//! [`ImageReshaper`] fits a single image onto a fixed canvas without
//! distorting it; [`DataFormatter`] runs it over every image in a
//! [`QuestionBank`](crate::bank::QuestionBank). The free functions here are
//! shared with the persistence layer, which can re-encode images on save.

pub mod formatter;
pub mod reshaper;

pub use formatter::{DataFormat, DataFormatter, FormatError, FormatReport};
pub use reshaper::{ImageReshaper, PADDING_GRAY};

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Extensions accepted for input and output images.
pub const VALID_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Errors from loading, transforming, or writing images.
#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("invalid canvas size {width}x{height}: {reason}")]
    InvalidCanvas {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("unsupported image extension {extension:?}; expected one of {:?}", VALID_EXTENSIONS)]
    UnsupportedExtension { extension: String },

    #[error("failed to load image {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save image {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Lower-case an extension, drop a leading dot, and check it is supported.
pub fn normalize_extension(extension: &str) -> Result<String, ReshapeError> {
    let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    if VALID_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ReshapeError::UnsupportedExtension {
            extension: extension.to_string(),
        })
    }
}

/// Only PNG and GIF keep an alpha channel in this pipeline.
pub fn supports_alpha(extension: &str) -> bool {
    matches!(extension.to_ascii_lowercase().as_str(), "png" | "gif")
}

/// MIME type for a supported extension, used when building data URLs.
pub fn mime_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, ReshapeError> {
    image::open(path).map_err(|source| ReshapeError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode `image` to `path` in the format named by `extension`.
///
/// Formats without alpha support get a plain 8-bit RGB buffer (greyscale is
/// left alone); encoders reject RGBA and 16-bit buffers otherwise.
pub fn save_image(image: DynamicImage, path: &Path, extension: &str) -> Result<(), ReshapeError> {
    let ext = normalize_extension(extension)?;
    let format = ImageFormat::from_extension(&ext).ok_or_else(|| ReshapeError::UnsupportedExtension {
        extension: extension.to_string(),
    })?;

    let image = if !supports_alpha(&ext)
        && !matches!(image, DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_))
    {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReshapeError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    image
        .save_with_format(path, format)
        .map_err(|source| ReshapeError::Save {
            path: path.to_path_buf(),
            source,
        })
}
