//! Core library for hybrid PDF text extraction.
//!
//! This crate provides:
//! - Direct text extraction through poppler's `pdftotext`
//! - Page rasterization through poppler's `pdftocairo`
//! - OCR of rendered pages through the `tesseract` CLI
//! - The hybrid orchestrator deciding, page by page, between the two

pub mod cache;
pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::ImageCache;
pub use error::{ExtractionError, OcrError, PoppleractError, RasterizationError, Result, ToolError};
pub use extract::{
    ExtractionOutput, HybridExtractor, HybridExtractorBuilder, PageResult, PageSource, PAGE_SEPARATOR,
};
pub use models::config::PoppleractConfig;
pub use models::params::{ExtractionParams, Strategy};
pub use ocr::{OcrOptions, OcrRunner, TesseractRunner};
pub use pdf::{
    DirectTextExtractor, PageRange, PageRasterizer, PdftocairoRasterizer, PdftotextExtractor, RenderFormat,
    RenderRequest, RenderedPages, TextOptions,
};
