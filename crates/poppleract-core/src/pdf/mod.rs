//! PDF processing: direct text extraction, page counting and rasterization.

mod raster;
mod text;

pub use raster::{
    page_index_from_file_name, PageRange, PageRasterizer, PdftocairoRasterizer, RenderFormat, RenderRequest,
    RenderedPages,
};
pub use text::{split_pages, DirectTextExtractor, PdftotextExtractor, TextOptions, PAGE_BREAK};

use std::path::Path;

use lopdf::Document;
use tracing::debug;

use crate::error::ExtractionError;

/// Count the pages of a PDF by reading its page tree.
///
/// lopdf does not repair broken cross-reference tables the way poppler does;
/// [`PdftotextExtractor`] falls back to `pdfinfo` when this fails or finds no pages.
pub fn count_pages(path: &Path) -> Result<u32, ExtractionError> {
    let doc = Document::load(path).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let page_count = doc.get_pages().len() as u32;
    if page_count == 0 {
        return Err(ExtractionError::NoPages);
    }

    debug!("{} has {} pages", path.display(), page_count);
    Ok(page_count)
}
