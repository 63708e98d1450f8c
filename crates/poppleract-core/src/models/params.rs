//! Per-request extraction parameters.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PoppleractError, Result};
use crate::ocr::OcrOptions;
use crate::pdf::TextOptions;

/// Highest tesseract OCR engine mode (`--oem`).
pub const MAX_OEM: u8 = 3;

/// Highest tesseract page segmentation mode (`--psm`).
pub const MAX_PSM: u8 = 13;

/// Highest tesseract `thresholding_method` (0 Otsu, 1 Leptonica Otsu, 2 Sauvola).
pub const MAX_THRESHOLDING_METHOD: u8 = 2;

/// How pages are turned into text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Direct extraction, OCR for pages below the character threshold.
    #[default]
    Hybrid,
    /// Direct extraction only; every page is accepted.
    Direct,
    /// OCR only; every page is rendered and recognized.
    Ocr,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::Direct => "direct",
            Self::Ocr => "ocr",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "direct" | "pdftotext" => Ok(Self::Direct),
            "ocr" | "tesseract" => Ok(Self::Ocr),
            other => Err(format!("unknown strategy '{other}' (expected hybrid, direct or ocr)")),
        }
    }
}

/// Options for one extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParams {
    /// Pages whose trimmed direct text has fewer characters than this are OCR'd.
    pub minimum_chars_number: usize,

    /// Keep strings in content stream order (`pdftotext -raw`).
    pub raw: bool,

    /// Maintain the physical layout (`pdftotext -layout`).
    pub physical: bool,

    /// Rendering resolution, also passed to tesseract. Must be positive.
    pub dpi: u32,

    /// Tesseract language(s), several joined with `+` (e.g. `eng+ita`).
    pub lang: String,

    /// Tesseract OCR engine mode, 0..=3.
    pub oem: u8,

    /// Tesseract page segmentation mode, 0..=13.
    pub psm: u8,

    /// Tesseract binarization method, 0..=2.
    pub thresholding_method: u8,

    /// Tesseract `preserve_interword_spaces`.
    pub preserve_interword_spaces: bool,

    /// Directory holding `<lang>.traineddata` files; tesseract's default when unset.
    pub tessdata_dir: Option<PathBuf>,

    /// Which extraction strategy to run.
    pub strategy: Strategy,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            minimum_chars_number: 20,
            raw: false,
            physical: false,
            dpi: 200,
            lang: "eng".to_string(),
            oem: 3,
            psm: 3,
            thresholding_method: 0,
            preserve_interword_spaces: true,
            tessdata_dir: None,
            strategy: Strategy::Hybrid,
        }
    }
}

impl ExtractionParams {
    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        if self.dpi == 0 {
            return Err(PoppleractError::Config("dpi must be a positive integer".to_string()));
        }
        if self.raw && self.physical {
            return Err(PoppleractError::Config(
                "raw and physical are mutually exclusive".to_string(),
            ));
        }
        validate_lang(&self.lang)?;
        if self.oem > MAX_OEM {
            return Err(PoppleractError::Config(format!(
                "oem must be in 0..={MAX_OEM}, got {}",
                self.oem
            )));
        }
        if self.psm > MAX_PSM {
            return Err(PoppleractError::Config(format!(
                "psm must be in 0..={MAX_PSM}, got {}",
                self.psm
            )));
        }
        if self.thresholding_method > MAX_THRESHOLDING_METHOD {
            return Err(PoppleractError::Config(format!(
                "thresholding_method must be in 0..={MAX_THRESHOLDING_METHOD}, got {}",
                self.thresholding_method
            )));
        }
        if let Some(dir) = &self.tessdata_dir {
            if dir.as_os_str().is_empty() {
                return Err(PoppleractError::Config("tessdata_dir must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Options for the direct text extractor.
    pub fn text_options(&self) -> TextOptions {
        TextOptions {
            raw: self.raw,
            physical: self.physical,
        }
    }

    /// Options for the OCR runner.
    pub fn ocr_options(&self) -> OcrOptions {
        OcrOptions {
            lang: self.lang.clone(),
            oem: self.oem,
            psm: self.psm,
            dpi: self.dpi,
            thresholding_method: self.thresholding_method,
            preserve_interword_spaces: self.preserve_interword_spaces,
            tessdata_dir: self.tessdata_dir.clone(),
        }
    }
}

fn validate_lang(lang: &str) -> Result<()> {
    if lang.trim().is_empty() {
        return Err(PoppleractError::Config("lang must not be empty".to_string()));
    }
    for code in lang.split('+') {
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '/'));
        if !valid {
            return Err(PoppleractError::Config(format!("invalid language code '{code}' in '{lang}'")));
        }
    }
    Ok(())
}
