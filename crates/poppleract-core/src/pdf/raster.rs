//! Page rasterization with poppler's `pdftocairo`.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RasterizationError;
use crate::models::config::ToolConfig;
use crate::tool::ToolCommand;

/// Image format of rendered pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Png,
    Jpeg,
    Tiff,
}

impl RenderFormat {
    fn flag(&self) -> &'static str {
        match self {
            Self::Png => "-png",
            Self::Jpeg => "-jpeg",
            Self::Tiff => "-tiff",
        }
    }

    /// File extension `pdftocairo` gives images of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Tiff => "tif",
        }
    }
}

/// Inclusive, 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

impl PageRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Every page of a document.
    pub fn all(page_count: u32) -> Self {
        Self::new(1, page_count)
    }

    /// Smallest range containing all of `pages`.
    pub fn covering(pages: &[u32]) -> Option<Self> {
        let first = pages.iter().copied().min()?;
        let last = pages.iter().copied().max()?;
        Some(Self::new(first, last))
    }

    pub fn validate(&self, page_count: u32) -> Result<(), RasterizationError> {
        if self.first < 1 || self.first > self.last || self.last > page_count {
            return Err(RasterizationError::InvalidRange {
                first: self.first,
                last: self.last,
                page_count,
            });
        }
        Ok(())
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages().contains(&page)
    }
}

/// One rendering call.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub pdf: PathBuf,
    pub output_dir: PathBuf,
    pub dpi: u32,
    pub format: RenderFormat,
    pub range: PageRange,
    /// Page count of the document, for range validation.
    pub page_count: u32,
    /// File name prefix of the rendered images.
    pub prefix: String,
}

/// Rendered page images, keyed by page index.
#[derive(Debug, Clone, Default)]
pub struct RenderedPages {
    images: BTreeMap<u32, PathBuf>,
}

impl RenderedPages {
    pub fn new(images: BTreeMap<u32, PathBuf>) -> Self {
        Self { images }
    }

    pub fn image(&self, page: u32) -> Option<&Path> {
        self.images.get(&page).map(PathBuf::as_path)
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.images.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Scan `dir` for the images of `range` written with `prefix`.
    ///
    /// Fails if any page of the range has no image.
    pub async fn collect(
        dir: &Path,
        prefix: &str,
        format: RenderFormat,
        range: PageRange,
    ) -> Result<Self, RasterizationError> {
        let mut images = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(page) = page_index_from_file_name(name, prefix, format.extension()) {
                if range.contains(page) {
                    images.insert(page, entry.path());
                }
            }
        }

        if let Some(missing) = range.pages().find(|page| !images.contains_key(page)) {
            return Err(RasterizationError::MissingPage(missing));
        }

        Ok(Self::new(images))
    }
}

/// Page index encoded in a rendered image name such as `pag-007.png`.
///
/// Zero padding width is whatever the renderer chose.
pub fn page_index_from_file_name(name: &str, prefix: &str, extension: &str) -> Option<u32> {
    let number = name
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

/// Renders PDF pages to image files.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render every page of `request.range` into `request.output_dir`.
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPages, RasterizationError>;
}

/// [`PageRasterizer`] running `pdftocairo`.
#[derive(Debug, Clone)]
pub struct PdftocairoRasterizer {
    tool: ToolConfig,
}

impl PdftocairoRasterizer {
    pub fn new(tool: ToolConfig) -> Self {
        Self { tool }
    }

    fn command(&self, request: &RenderRequest) -> ToolCommand {
        self.tool
            .command()
            .arg(request.format.flag())
            .arg("-r")
            .arg(request.dpi.to_string())
            .arg("-f")
            .arg(request.range.first.to_string())
            .arg("-l")
            .arg(request.range.last.to_string())
            .arg(&request.pdf)
            .arg(request.output_dir.join(&request.prefix))
    }
}

impl Default for PdftocairoRasterizer {
    fn default() -> Self {
        Self::new(ToolConfig::new("pdftocairo", 300))
    }
}

#[async_trait]
impl PageRasterizer for PdftocairoRasterizer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPages, RasterizationError> {
        request.range.validate(request.page_count)?;
        tokio::fs::create_dir_all(&request.output_dir).await?;

        self.command(request).run().await?;

        let rendered =
            RenderedPages::collect(&request.output_dir, &request.prefix, request.format, request.range).await?;
        debug!(
            pdf = %request.pdf.display(),
            first = request.range.first,
            last = request.range.last,
            dpi = request.dpi,
            images = rendered.len(),
            "pages rendered"
        );
        Ok(rendered)
    }
}
