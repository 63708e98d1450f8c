//! Direct text extraction with poppler's `pdftotext`.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::config::ToolConfig;
use crate::tool::ToolCommand;

/// Page break emitted by `pdftotext` after every page.
pub const PAGE_BREAK: char = '\x0c';

/// Layout options for direct extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextOptions {
    /// Keep strings in content stream order.
    pub raw: bool,
    /// Maintain the original physical layout.
    pub physical: bool,
}

/// Extracts the embedded text layer of a PDF.
#[async_trait]
pub trait DirectTextExtractor: Send + Sync {
    /// Extract the text of the whole document, pages separated by [`PAGE_BREAK`].
    async fn extract(&self, pdf: &Path, options: TextOptions) -> Result<String, ExtractionError>;

    /// Number of pages in the document.
    async fn page_count(&self, pdf: &Path) -> Result<u32, ExtractionError> {
        page_tree_count(pdf).await
    }
}

/// [`super::count_pages`] off the async runtime.
async fn page_tree_count(pdf: &Path) -> Result<u32, ExtractionError> {
    let path = pdf.to_path_buf();
    tokio::task::spawn_blocking(move || super::count_pages(&path))
        .await
        .map_err(|e| ExtractionError::Parse(format!("page counting task failed: {e}")))?
}

/// [`DirectTextExtractor`] running `pdftotext`.
///
/// Pages are counted from the lopdf page tree. Files lopdf cannot parse but
/// poppler can repair are counted with `pdfinfo` instead, so the count agrees
/// with what `pdftotext` will produce.
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    tool: ToolConfig,
    pdfinfo: ToolConfig,
}

impl PdftotextExtractor {
    pub fn new(tool: ToolConfig) -> Self {
        Self {
            tool,
            pdfinfo: ToolConfig::new("pdfinfo", 60),
        }
    }

    /// Program used to count pages when lopdf cannot read the file.
    pub fn with_pdfinfo(mut self, pdfinfo: ToolConfig) -> Self {
        self.pdfinfo = pdfinfo;
        self
    }

    async fn pdfinfo_page_count(&self, pdf: &Path) -> Result<u32, ExtractionError> {
        let output = self.pdfinfo.command().arg(pdf).run().await?;
        match parse_pdfinfo_pages(&output.stdout_text()) {
            Some(0) => Err(ExtractionError::NoPages),
            Some(pages) => Ok(pages),
            None => Err(ExtractionError::Parse(format!(
                "{} reported no page count for {}",
                self.pdfinfo.program,
                pdf.display()
            ))),
        }
    }

    fn command(&self, pdf: &Path, options: TextOptions) -> ToolCommand {
        let mut command = self.tool.command();
        if options.raw {
            command = command.arg("-raw");
        }
        if options.physical {
            command = command.arg("-layout");
        }
        command.args(["-enc", "UTF-8"]).arg(pdf).arg("-")
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new(ToolConfig::new("pdftotext", 120))
    }
}

#[async_trait]
impl DirectTextExtractor for PdftotextExtractor {
    async fn extract(&self, pdf: &Path, options: TextOptions) -> Result<String, ExtractionError> {
        let output = self.command(pdf, options).run().await?;
        let text = output.stdout_text();
        debug!(
            pdf = %pdf.display(),
            chars = text.chars().count(),
            "pdftotext finished"
        );
        Ok(text)
    }

    async fn page_count(&self, pdf: &Path) -> Result<u32, ExtractionError> {
        match page_tree_count(pdf).await {
            Err(reason @ (ExtractionError::Parse(_) | ExtractionError::NoPages)) => {
                warn!(pdf = %pdf.display(), %reason, "page tree unreadable, counting with pdfinfo");
                self.pdfinfo_page_count(pdf).await
            }
            other => other,
        }
    }
}

/// Value of the `Pages:` line of `pdfinfo` output.
fn parse_pdfinfo_pages(output: &str) -> Option<u32> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse().ok())
}

/// Split `pdftotext` output into per-page chunks.
///
/// Every page, the last included, is terminated by a form feed; the final
/// terminator is dropped so an N-page document yields exactly N chunks.
pub fn split_pages(text: &str) -> Vec<&str> {
    let body = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
    body.split(PAGE_BREAK).collect()
}
