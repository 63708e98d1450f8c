//! Scripted stand-ins for the external tools.
//!
//! Compiled for this crate's tests and behind the `testing` feature, so
//! downstream crates can exercise the orchestrator without poppler or
//! tesseract installed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ExtractionError, OcrError, RasterizationError, ToolError};
use crate::ocr::{OcrOptions, OcrRunner};
use crate::pdf::{
    page_index_from_file_name, DirectTextExtractor, PageRange, PageRasterizer, RenderRequest, RenderedPages, TextOptions,
    PAGE_BREAK,
};

fn tool_failure(program: &str, stderr: &str) -> ToolError {
    ToolError::Io {
        program: program.to_string(),
        source: std::io::Error::other(stderr.to_string()),
    }
}

/// Direct extractor returning scripted page texts.
#[derive(Debug, Default)]
pub struct FakeDirectExtractor {
    pages: Vec<String>,
    page_count: Option<u32>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeDirectExtractor {
    pub fn new<S: Into<String>>(pages: impl IntoIterator<Item = S>) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Report a page count different from the number of scripted pages.
    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = Some(page_count);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `extract` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectTextExtractor for FakeDirectExtractor {
    async fn extract(&self, _pdf: &Path, _options: TextOptions) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(tool_failure("pdftotext", "Command Line Error: Incorrect password").into());
        }
        let mut text = String::new();
        for page in &self.pages {
            text.push_str(page);
            text.push(PAGE_BREAK);
        }
        Ok(text)
    }

    async fn page_count(&self, _pdf: &Path) -> Result<u32, ExtractionError> {
        Ok(self.page_count.unwrap_or(self.pages.len() as u32))
    }
}

/// Rasterizer writing empty `<prefix>-<page>.<ext>` files.
#[derive(Debug, Default)]
pub struct FakeRasterizer {
    fail: bool,
    requests: Mutex<Vec<PageRange>>,
}

impl FakeRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Ranges requested so far.
    pub fn requests(&self) -> Vec<PageRange> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPages, RasterizationError> {
        request.range.validate(request.page_count)?;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.range);
        }
        if self.fail {
            return Err(tool_failure("pdftocairo", "I/O Error: Couldn't open file").into());
        }

        tokio::fs::create_dir_all(&request.output_dir).await?;
        let mut images = BTreeMap::new();
        for page in request.range.pages() {
            let path = request
                .output_dir
                .join(format!("{}-{:02}.{}", request.prefix, page, request.format.extension()));
            tokio::fs::write(&path, b"").await?;
            images.insert(page, path);
        }
        Ok(RenderedPages::new(images))
    }
}

/// OCR runner returning scripted text per page index.
#[derive(Debug, Default)]
pub struct FakeOcr {
    texts: HashMap<u32, String>,
    delays: HashMap<u32, Duration>,
    failing_pages: HashSet<u32>,
    recognized: Mutex<Vec<u32>>,
}

impl FakeOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, text: impl Into<String>) -> Self {
        self.texts.insert(page, text.into());
        self
    }

    /// Delay the answer for `page`, to shuffle completion order.
    pub fn with_delay(mut self, page: u32, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// Pages recognized so far, in call order.
    pub fn recognized(&self) -> Vec<u32> {
        self.recognized.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.recognized().len()
    }
}

#[async_trait]
impl OcrRunner for FakeOcr {
    async fn recognize(&self, image: &Path, _options: &OcrOptions) -> Result<String, OcrError> {
        if !tokio::fs::try_exists(image).await.unwrap_or(false) {
            return Err(OcrError::ImageNotFound(image.to_path_buf()));
        }
        let page = image
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| {
                let extension = image.extension()?.to_str()?;
                let prefix = name.split('-').next()?;
                page_index_from_file_name(name, prefix, extension)
            })
            .ok_or_else(|| OcrError::InvalidImage {
                path: image.to_path_buf(),
                reason: "not a rendered page image".to_string(),
            })?;

        if let Ok(mut recognized) = self.recognized.lock() {
            recognized.push(page);
        }
        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_pages.contains(&page) {
            return Err(tool_failure("tesseract", "Error in pixReadStream").into());
        }
        Ok(self.texts.get(&page).cloned().unwrap_or_default())
    }
}
