//! Error types for the poppleract-core library.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the poppleract library.
#[derive(Error, Debug)]
pub enum PoppleractError {
    /// Direct text extraction failed.
    #[error("extraction failure: {0}")]
    Extraction(#[from] ExtractionError),

    /// Page rendering failed.
    #[error("rasterization failure: {0}")]
    Rasterization(#[from] RasterizationError),

    /// OCR of a page image failed.
    #[error("OCR failure: {0}")]
    Ocr(#[from] OcrError),

    /// Direct extraction produced a different number of pages than the document has.
    #[error("page count mismatch: document has {expected} pages but direct extraction produced {found} page chunks")]
    PageCountMismatch { expected: u32, found: usize },

    /// Invalid parameters or input, rejected before any tool runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PoppleractError {
    /// Whether the caller supplied something invalid, as opposed to a tool or system failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Failures of an external tool invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The process could not be started or awaited.
    #[error("failed to run `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish within its time budget and was killed.
    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    /// The process exited unsuccessfully.
    #[error("`{program}` failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Errors related to direct text extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The text extraction tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The PDF page tree could not be read.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to page rendering.
#[derive(Error, Debug)]
pub enum RasterizationError {
    /// The requested page range does not fit the document.
    #[error("invalid page range {first}..={last} for a document of {page_count} pages")]
    InvalidRange { first: u32, last: u32, page_count: u32 },

    /// The rendering tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The tool finished but no image exists for this page.
    #[error("no rendered image for page {0}")]
    MissingPage(u32),

    /// Output directory could not be prepared or listed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The page image does not exist.
    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    /// The page image exists but cannot be decoded.
    #[error("invalid image {}: {reason}", .path.display())]
    InvalidImage { path: PathBuf, reason: String },

    /// A requested language has no traineddata file in the tessdata directory.
    #[error("language '{lang}' is not available in {}", .tessdata_dir.display())]
    LanguageUnavailable { lang: String, tessdata_dir: PathBuf },

    /// The OCR tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Result type for the poppleract library.
pub type Result<T> = std::result::Result<T, PoppleractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_errors_are_client_errors() {
        assert!(PoppleractError::Config("dpi must be positive".to_string()).is_client_error());
        assert!(!PoppleractError::PageCountMismatch { expected: 3, found: 2 }.is_client_error());
        assert!(!PoppleractError::from(OcrError::ImageNotFound(PathBuf::from("pag-1.png"))).is_client_error());
    }

    #[test]
    fn test_timeout_message() {
        let err = ToolError::Timeout {
            program: "tesseract".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "`tesseract` timed out after 30s");
    }
}
