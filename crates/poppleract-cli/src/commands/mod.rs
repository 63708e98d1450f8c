//! Subcommands and the pieces they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod serve;
pub mod tools;

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tracing::debug;

use poppleract_core::{ExtractionOutput, ExtractionParams, PoppleractConfig, Strategy};

/// Extraction parameter flags; unset flags keep the configured value.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Minimum characters of direct text before a page is OCR'd
    #[arg(long, value_name = "N")]
    pub minimum_chars_number: Option<usize>,

    /// Keep strings in content stream order
    #[arg(long, conflicts_with = "physical")]
    pub raw: bool,

    /// Maintain the original physical layout
    #[arg(long)]
    pub physical: bool,

    /// Rendering resolution for OCR
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub dpi: Option<u32>,

    /// Tesseract language(s), e.g. "eng+ita"
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Tesseract OCR engine mode
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub oem: Option<u8>,

    /// Tesseract page segmentation mode
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=13))]
    pub psm: Option<u8>,

    /// Tesseract thresholding method (0 Otsu, 1 Leptonica Otsu, 2 Sauvola)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub thresholding_method: Option<u8>,

    /// Tesseract preserve_interword_spaces (0 or 1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub preserve_interword_spaces: Option<u8>,

    /// Directory holding tesseract language data
    #[arg(long)]
    pub tessdata_dir: Option<PathBuf>,

    /// Extraction strategy: hybrid, direct or ocr
    #[arg(short, long)]
    pub strategy: Option<Strategy>,
}

impl ParamArgs {
    /// Apply the flags on top of `base`.
    pub fn resolve(&self, base: &ExtractionParams) -> ExtractionParams {
        let mut params = base.clone();
        if let Some(n) = self.minimum_chars_number {
            params.minimum_chars_number = n;
        }
        if self.raw {
            params.raw = true;
            params.physical = false;
        }
        if self.physical {
            params.physical = true;
            params.raw = false;
        }
        if let Some(dpi) = self.dpi {
            params.dpi = dpi;
        }
        if let Some(lang) = &self.lang {
            params.lang = lang.clone();
        }
        if let Some(oem) = self.oem {
            params.oem = oem;
        }
        if let Some(psm) = self.psm {
            params.psm = psm;
        }
        if let Some(method) = self.thresholding_method {
            params.thresholding_method = method;
        }
        if let Some(preserve) = self.preserve_interword_spaces {
            params.preserve_interword_spaces = preserve == 1;
        }
        if let Some(dir) = &self.tessdata_dir {
            params.tessdata_dir = Some(dir.clone());
        }
        if let Some(strategy) = self.strategy {
            params.strategy = strategy;
        }
        params
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poppleract")
        .join("config.json")
}

/// Load the configuration from `path`, the default location, or defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<PoppleractConfig> {
    if let Some(path) = path {
        return Ok(PoppleractConfig::from_file(Path::new(path))?);
    }
    let default_path = default_config_path();
    if default_path.is_file() {
        debug!("Loading config from {}", default_path.display());
        return Ok(PoppleractConfig::from_file(&default_path)?);
    }
    Ok(PoppleractConfig::default())
}

/// Summary reported for one extracted file.
#[derive(Debug, Serialize)]
pub struct ExtractionSummary {
    pub file_name: String,
    pub file_size_mb: f64,
    pub num_extracted_chars: usize,
    pub extracted_text: String,
}

impl ExtractionSummary {
    pub fn new(file_name: impl Into<String>, file_size_bytes: u64, output: ExtractionOutput) -> Self {
        Self {
            file_name: file_name.into(),
            file_size_mb: size_in_mb(file_size_bytes),
            num_extracted_chars: output.num_extracted_chars,
            extracted_text: output.extracted_text,
        }
    }
}

/// Size in decimal megabytes, rounded to 4 places.
pub fn size_in_mb(bytes: u64) -> f64 {
    (bytes as f64 / 1e6 * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        params: ParamArgs,
    }

    #[test]
    fn test_unset_flags_keep_base() {
        let base = ExtractionParams {
            minimum_chars_number: 50,
            lang: "ita".to_string(),
            ..Default::default()
        };
        let params = ParamArgs::default().resolve(&base);
        assert_eq!(params, base);
    }

    #[test]
    fn test_flags_override() {
        let cli = TestCli::parse_from([
            "test",
            "--minimum-chars-number",
            "5",
            "--physical",
            "--dpi",
            "300",
            "-l",
            "eng+ita",
            "--psm",
            "6",
            "--preserve-interword-spaces",
            "0",
            "--strategy",
            "ocr",
        ]);
        let params = cli.params.resolve(&ExtractionParams::default());
        assert_eq!(params.minimum_chars_number, 5);
        assert!(params.physical);
        assert_eq!(params.dpi, 300);
        assert_eq!(params.lang, "eng+ita");
        assert_eq!(params.psm, 6);
        assert!(!params.preserve_interword_spaces);
        assert_eq!(params.strategy, Strategy::Ocr);
    }

    #[test]
    fn test_out_of_range_flags_rejected() {
        assert!(TestCli::try_parse_from(["test", "--psm", "14"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--preserve-interword-spaces", "2"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--dpi", "0"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--raw", "--physical"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--strategy", "magic"]).is_err());
    }

    #[test]
    fn test_size_in_mb() {
        assert_eq!(size_in_mb(0), 0.0);
        assert_eq!(size_in_mb(1_000_000), 1.0);
        assert_eq!(size_in_mb(123_456), 0.1235);
    }
}
