use std::path::{Path, PathBuf};

use crate::bank::{BankError, QuestionBank};

use super::{normalize_extension, ImageReshaper, ReshapeError};

/// Smallest canvas side accepted by [`DataFormat`].
pub const MIN_SIDE: u32 = 28;

/// Target shape and encodings for a formatting run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFormat {
    width: u32,
    height: u32,
    input_extension: Option<String>,
    output_extension: String,
}

impl DataFormat {
    /// `input_extension = None` reads each image with the extension of its
    /// current path.
    pub fn new(
        width: u32,
        height: u32,
        input_extension: Option<&str>,
        output_extension: &str,
    ) -> Result<Self, ReshapeError> {
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(ReshapeError::InvalidCanvas {
                width,
                height,
                reason: "both sides must be at least 28 pixels",
            });
        }
        Ok(Self {
            width,
            height,
            input_extension: input_extension.map(normalize_extension).transpose()?,
            output_extension: normalize_extension(output_extension)?,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }
}

impl Default for DataFormat {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            input_extension: None,
            output_extension: "jpg".to_string(),
        }
    }
}

/// Outcome of [`DataFormatter::format`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatReport {
    pub reshaped: usize,
    pub text_only: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error(transparent)]
    Image(#[from] ReshapeError),

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error("question {qid:?} image path {} has no usable extension", path.display())]
    MissingExtension { qid: String, path: PathBuf },
}

/// Reshapes every question image in a bank into a new directory.
#[derive(Debug, Clone)]
pub struct DataFormatter {
    format: DataFormat,
    reshaper: ImageReshaper,
}

impl DataFormatter {
    pub fn new(format: DataFormat) -> Result<Self, ReshapeError> {
        let (width, height) = format.size();
        Ok(Self {
            reshaper: ImageReshaper::new(width, height)?,
            format,
        })
    }

    pub fn with_padding(mut self, padding: [u8; 3]) -> Self {
        self.reshaper = self.reshaper.with_padding(padding);
        self
    }

    /// Reshape `{img_dir}/{qid}.{ext}` for every question with an image,
    /// point each question at its new file, then move the bank to
    /// `new_img_dir`.
    ///
    /// All images are written before the bank is touched: on failure the
    /// bank keeps its old paths and `img_dir`. Files already written to
    /// `new_img_dir` are left in place.
    pub fn format(&self, bank: &mut QuestionBank, new_img_dir: &Path) -> Result<FormatReport, FormatError> {
        std::fs::create_dir_all(new_img_dir).map_err(|source| ReshapeError::CreateDir {
            path: new_img_dir.to_path_buf(),
            source,
        })?;

        let source_dir = bank.img_dir().to_path_buf();
        let mut report = FormatReport::default();
        let mut moved: Vec<(String, PathBuf)> = Vec::new();

        for question in bank.questions() {
            let qid = question.qid();
            let Some(current) = question.img_path() else {
                report.text_only += 1;
                continue;
            };

            let input_ext = match &self.format.input_extension {
                Some(ext) => ext.clone(),
                None => current
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(|e| normalize_extension(e).ok())
                    .ok_or_else(|| FormatError::MissingExtension {
                        qid: qid.to_string(),
                        path: current.to_path_buf(),
                    })?,
            };

            let new_path = self.reshaper.reshape(
                qid,
                &source_dir,
                new_img_dir,
                &input_ext,
                &self.format.output_extension,
            )?;
            moved.push((qid.to_string(), new_path));
        }

        report.reshaped = moved.len();
        let mut updated = bank.clone();
        for (qid, path) in moved {
            updated.set_question_img_path(&qid, Some(path))?;
        }
        updated.set_img_dir(new_img_dir)?;
        *bank = updated;

        tracing::info!(
            reshaped = report.reshaped,
            text_only = report.text_only,
            img_dir = %new_img_dir.display(),
            "question bank formatted"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_small_shapes() {
        assert!(matches!(
            DataFormat::new(27, 256, None, "jpg"),
            Err(ReshapeError::InvalidCanvas { .. })
        ));
        assert!(DataFormat::new(28, 28, None, "jpg").is_ok());
    }

    #[test]
    fn extensions_are_normalised() {
        let format = DataFormat::new(64, 64, Some("PNG"), ".WebP").unwrap();
        assert_eq!(format.input_extension.as_deref(), Some("png"));
        assert_eq!(format.output_extension(), "webp");
        assert!(DataFormat::new(64, 64, Some("tif"), "jpg").is_err());
    }

    #[test]
    fn default_is_square_jpeg() {
        let format = DataFormat::default();
        assert_eq!(format.size(), (256, 256));
        assert_eq!(format.output_extension(), "jpg");
    }
}
