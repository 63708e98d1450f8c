//! OCR of rendered page images.

mod tesseract;

pub use tesseract::TesseractRunner;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::OcrError;

/// Tesseract options for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOptions {
    /// Language(s), several joined with `+`.
    pub lang: String,
    /// OCR engine mode.
    pub oem: u8,
    /// Page segmentation mode.
    pub psm: u8,
    /// Resolution the image was rendered at.
    pub dpi: u32,
    pub thresholding_method: u8,
    pub preserve_interword_spaces: bool,
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
            oem: 3,
            psm: 3,
            dpi: 200,
            thresholding_method: 0,
            preserve_interword_spaces: true,
            tessdata_dir: None,
        }
    }
}

impl OcrOptions {
    /// Individual language codes.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.lang.split('+').filter(|code| !code.is_empty())
    }
}

/// Recognizes the text of a single page image.
#[async_trait]
pub trait OcrRunner: Send + Sync {
    async fn recognize(&self, image: &Path, options: &OcrOptions) -> Result<String, OcrError>;
}
