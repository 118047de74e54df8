//! Aspect-preserving resize onto a fixed-size canvas.
//!
//! Pipeline per image: fetch, rescale, centre on a padded canvas, save.
//! - Larger than the canvas on either axis: contain-fit downscale.
//! - Smaller on both axes: cover-fit upscale, overshoot is centre-cropped.
//! - Otherwise the image is pasted as-is.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

use super::{load_image, normalize_extension, save_image, ReshapeError};

/// Default padding colour for the canvas.
pub const PADDING_GRAY: [u8; 3] = [127, 127, 127];

const FILTER: FilterType = FilterType::Lanczos3;

/// Fits images onto a `width` x `height` canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageReshaper {
    width: u32,
    height: u32,
    padding: [u8; 3],
}

impl ImageReshaper {
    pub fn new(width: u32, height: u32) -> Result<Self, ReshapeError> {
        if width == 0 || height == 0 {
            return Err(ReshapeError::InvalidCanvas {
                width,
                height,
                reason: "dimensions must be positive",
            });
        }
        Ok(Self {
            width,
            height,
            padding: PADDING_GRAY,
        })
    }

    /// Square canvas shorthand.
    pub fn square(side: u32) -> Result<Self, ReshapeError> {
        Self::new(side, side)
    }

    pub fn with_padding(mut self, padding: [u8; 3]) -> Self {
        self.padding = padding;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reshape `{input_dir}/{name}.{input_extension}` and write it to
    /// `{output_dir}/{name}.{output_extension}`, creating `output_dir` when
    /// needed. Returns the written path.
    pub fn reshape(
        &self,
        name: &str,
        input_dir: &Path,
        output_dir: &Path,
        input_extension: &str,
        output_extension: &str,
    ) -> Result<PathBuf, ReshapeError> {
        let input_ext = normalize_extension(input_extension)?;
        let output_ext = normalize_extension(output_extension)?;

        let source_path = input_dir.join(format!("{name}.{input_ext}"));
        let source = load_image(&source_path)?;

        let fitted = self.fit(&source);

        std::fs::create_dir_all(output_dir).map_err(|source| ReshapeError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let output_path = output_dir.join(format!("{name}.{output_ext}"));
        save_image(fitted, &output_path, &output_ext)?;

        tracing::debug!(
            name,
            source = %source_path.display(),
            output = %output_path.display(),
            from = ?(source.width(), source.height()),
            to = ?self.size(),
            "image reshaped"
        );
        Ok(output_path)
    }

    /// Rescale then pad/crop `image` onto the canvas. The result is always
    /// exactly `size()`.
    pub fn fit(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = (image.width(), image.height());
        let rescaled = match self.scaled_size(width, height) {
            Some((w, h)) if w > self.width || h > self.height => {
                let (x, y, crop_w, crop_h) = self.crop_window(width, height, w, h);
                image
                    .crop_imm(x, y, crop_w, crop_h)
                    .resize_exact(w.min(self.width), h.min(self.height), FILTER)
            }
            Some((w, h)) => image.resize_exact(w, h, FILTER),
            None => image.clone(),
        };
        self.paste_centered(&rescaled)
    }

    /// Centred source region `(x, y, width, height)` that stays visible when a
    /// `width` x `height` image scaled to `scaled_w` x `scaled_h` overshoots
    /// the canvas. Cropping first keeps the resize buffer at canvas size.
    pub fn crop_window(&self, width: u32, height: u32, scaled_w: u32, scaled_h: u32) -> (u32, u32, u32, u32) {
        let visible = |source: u32, scaled: u32, canvas: u32| -> u32 {
            if scaled <= canvas {
                return source;
            }
            let kept = f64::from(source) * f64::from(canvas) / f64::from(scaled);
            (kept.round() as u32).clamp(1, source)
        };
        let crop_w = visible(width, scaled_w, self.width);
        let crop_h = visible(height, scaled_h, self.height);
        ((width - crop_w) / 2, (height - crop_h) / 2, crop_w, crop_h)
    }

    /// Target size after the rescale step, or `None` when no rescale applies.
    pub fn scaled_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let width_ratio = f64::from(self.width) / f64::from(width);
        let height_ratio = f64::from(self.height) / f64::from(height);

        let scale = if width > self.width || height > self.height {
            width_ratio.min(height_ratio)
        } else if width < self.width && height < self.height {
            width_ratio.max(height_ratio)
        } else {
            return None;
        };

        let new_width = (f64::from(width) * scale).round().max(1.0) as u32;
        let new_height = (f64::from(height) * scale).round().max(1.0) as u32;
        Some((new_width, new_height))
    }

    /// Top-left paste position that centres an image of the given size.
    /// Negative when the image overshoots the canvas.
    pub fn paste_offset(&self, width: u32, height: u32) -> (i64, i64) {
        (
            (i64::from(self.width) - i64::from(width)).div_euclid(2),
            (i64::from(self.height) - i64::from(height)).div_euclid(2),
        )
    }

    fn paste_centered(&self, image: &DynamicImage) -> DynamicImage {
        let (x, y) = self.paste_offset(image.width(), image.height());
        let [r, g, b] = self.padding;

        if image.color().has_alpha() {
            let mut canvas = RgbaImage::from_pixel(self.width, self.height, Rgba([r, g, b, 255]));
            imageops::replace(&mut canvas, &image.to_rgba8(), x, y);
            DynamicImage::ImageRgba8(canvas)
        } else {
            let mut canvas = RgbImage::from_pixel(self.width, self.height, Rgb([r, g, b]));
            imageops::replace(&mut canvas, &image.to_rgb8(), x, y);
            DynamicImage::ImageRgb8(canvas)
        }
    }
}
