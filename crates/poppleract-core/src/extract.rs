//! Hybrid extraction: direct text first, OCR for pages without enough of it.
//!
//! For each page the orchestrator moves through
//! `pending -> direct-extracted -> (accepted | needs-ocr) -> ocr-extracted -> final`.
//! Pages needing OCR are collected before anything is rendered; the image
//! cache is created only when at least one page needs OCR, the document is
//! rendered once over the covering page range, and pages are recognized in
//! ascending order. Any failure aborts the whole document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::ImageCache;
use crate::error::{PoppleractError, RasterizationError, Result};
use crate::models::config::PoppleractConfig;
use crate::models::params::{ExtractionParams, Strategy};
use crate::ocr::{OcrOptions, OcrRunner, TesseractRunner};
use crate::pdf::{
    split_pages, DirectTextExtractor, PageRange, PageRasterizer, PdftocairoRasterizer, PdftotextExtractor,
    RenderFormat, RenderRequest, RenderedPages,
};

/// Separator placed between consecutive pages of the output.
pub const PAGE_SEPARATOR: &str = "\n\n<END_PAGE>\n\n";

/// File name prefix of rendered page images.
pub const IMAGE_PREFIX: &str = "pag";

/// Where a page's final text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Direct,
    Ocr,
}

/// Final text of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    index: u32,
    text: String,
    source: PageSource,
}

impl PageResult {
    /// 1-based page index.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> PageSource {
        self.source
    }
}

/// Assembled result of one extraction call.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// Page texts in ascending page order, joined with [`PAGE_SEPARATOR`].
    pub extracted_text: String,
    /// Unicode scalar values in `extracted_text`.
    pub num_extracted_chars: usize,
    pub page_count: u32,
    pub pages: Vec<PageResult>,
    /// Image cache left on disk, when preserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl ExtractionOutput {
    pub fn ocr_page_count(&self) -> usize {
        self.pages.iter().filter(|p| p.source == PageSource::Ocr).count()
    }
}

/// Per-page state after the direct pass.
enum PageState {
    Accepted(String),
    NeedsOcr,
}

/// Whether direct text is long enough to skip OCR.
pub fn meets_threshold(candidate: &str, minimum_chars: usize) -> bool {
    candidate.trim().chars().count() >= minimum_chars
}

/// Join page texts in order with [`PAGE_SEPARATOR`].
pub fn assemble(pages: &[PageResult]) -> String {
    pages
        .iter()
        .map(PageResult::text)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// The hybrid extraction orchestrator.
///
/// Stateless between calls; one instance can serve concurrent extractions.
#[derive(Clone)]
pub struct HybridExtractor {
    direct: Arc<dyn DirectTextExtractor>,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrRunner>,
    cache_root: PathBuf,
    preserve_cache: bool,
    image_format: RenderFormat,
    ocr_concurrency: usize,
}

/// Builder for HybridExtractor.
pub struct HybridExtractorBuilder {
    direct: Option<Arc<dyn DirectTextExtractor>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    ocr: Option<Arc<dyn OcrRunner>>,
    cache_root: PathBuf,
    preserve_cache: bool,
    image_format: RenderFormat,
    ocr_concurrency: usize,
}

impl HybridExtractorBuilder {
    /// Create a new builder; unset tools default to poppler and tesseract.
    pub fn new() -> Self {
        Self {
            direct: None,
            rasterizer: None,
            ocr: None,
            cache_root: std::env::temp_dir().join("poppleract"),
            preserve_cache: false,
            image_format: RenderFormat::Png,
            ocr_concurrency: 1,
        }
    }

    pub fn with_direct_extractor(mut self, direct: Arc<dyn DirectTextExtractor>) -> Self {
        self.direct = Some(direct);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrRunner>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Root of per-run image caches, and whether caches outlive the run.
    pub fn with_cache(mut self, root: impl Into<PathBuf>, preserve: bool) -> Self {
        self.cache_root = root.into();
        self.preserve_cache = preserve;
        self
    }

    pub fn with_image_format(mut self, format: RenderFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Pages recognized concurrently; output order is unaffected.
    pub fn with_ocr_concurrency(mut self, concurrency: usize) -> Self {
        self.ocr_concurrency = concurrency.max(1);
        self
    }

    pub fn build(self) -> HybridExtractor {
        HybridExtractor {
            direct: self.direct.unwrap_or_else(|| Arc::new(PdftotextExtractor::default())),
            rasterizer: self.rasterizer.unwrap_or_else(|| Arc::new(PdftocairoRasterizer::default())),
            ocr: self.ocr.unwrap_or_else(|| Arc::new(TesseractRunner::default())),
            cache_root: self.cache_root,
            preserve_cache: self.preserve_cache,
            image_format: self.image_format,
            ocr_concurrency: self.ocr_concurrency,
        }
    }
}

impl Default for HybridExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HybridExtractor {
    pub fn builder() -> HybridExtractorBuilder {
        HybridExtractorBuilder::new()
    }

    /// Orchestrator backed by the real tools described in `config`.
    pub fn from_config(config: &PoppleractConfig) -> Self {
        Self::builder()
            .with_direct_extractor(Arc::new(
                PdftotextExtractor::new(config.tools.pdftotext.clone()).with_pdfinfo(config.tools.pdfinfo.clone()),
            ))
            .with_rasterizer(Arc::new(PdftocairoRasterizer::new(config.tools.pdftocairo.clone())))
            .with_ocr(Arc::new(TesseractRunner::new(config.tools.tesseract.clone())))
            .with_cache(config.cache.dir.clone(), config.cache.preserve)
            .with_image_format(config.cache.image_format)
            .with_ocr_concurrency(config.tools.ocr_concurrency)
            .build()
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Extract the text of `pdf`.
    pub async fn extract(&self, pdf: &Path, params: &ExtractionParams) -> Result<ExtractionOutput> {
        params.validate()?;
        check_input(pdf).await?;

        let started = Instant::now();
        let (page_count, states) = self.direct_pass(pdf, params).await?;

        let needs_ocr: Vec<u32> = states
            .iter()
            .enumerate()
            .filter(|(_, state)| matches!(state, PageState::NeedsOcr))
            .map(|(idx, _)| idx as u32 + 1)
            .collect();
        debug!(
            pdf = %pdf.display(),
            page_count,
            needs_ocr = ?needs_ocr,
            "direct pass complete"
        );

        let mut cache = ImageCache::for_document(&self.cache_root, pdf, self.preserve_cache);
        let mut ocr_texts = BTreeMap::new();
        if let Some(range) = PageRange::covering(&needs_ocr) {
            let rendered = self.render(pdf, params, page_count, range, &mut cache).await?;
            ocr_texts = self.recognize(&needs_ocr, &rendered, &params.ocr_options()).await?;
        }

        let mut pages = Vec::with_capacity(states.len());
        for (idx, state) in states.into_iter().enumerate() {
            let index = idx as u32 + 1;
            let (text, source) = match state {
                PageState::Accepted(text) => (text, PageSource::Direct),
                PageState::NeedsOcr => {
                    let text = ocr_texts
                        .remove(&index)
                        .ok_or(RasterizationError::MissingPage(index))?;
                    (text, PageSource::Ocr)
                }
            };
            pages.push(PageResult { index, text, source });
        }

        let extracted_text = assemble(&pages);
        let num_extracted_chars = extracted_text.chars().count();
        let cache_dir = cache.finish();

        info!(
            pdf = %pdf.display(),
            strategy = %params.strategy,
            page_count,
            ocr_pages = needs_ocr.len(),
            chars = num_extracted_chars,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extraction complete"
        );

        Ok(ExtractionOutput {
            extracted_text,
            num_extracted_chars,
            page_count,
            pages,
            cache_dir,
        })
    }

    /// Page count and the accept/needs-OCR decision for every page.
    async fn direct_pass(&self, pdf: &Path, params: &ExtractionParams) -> Result<(u32, Vec<PageState>)> {
        let page_count = self.direct.page_count(pdf).await?;

        if params.strategy == Strategy::Ocr {
            let states = (0..page_count).map(|_| PageState::NeedsOcr).collect();
            return Ok((page_count, states));
        }

        let raw = self.direct.extract(pdf, params.text_options()).await?;
        let chunks = split_pages(&raw);
        if chunks.len() != page_count as usize {
            return Err(PoppleractError::PageCountMismatch {
                expected: page_count,
                found: chunks.len(),
            });
        }

        let states = chunks
            .into_iter()
            .map(|chunk| {
                if params.strategy == Strategy::Direct || meets_threshold(chunk, params.minimum_chars_number) {
                    PageState::Accepted(chunk.to_string())
                } else {
                    PageState::NeedsOcr
                }
            })
            .collect();
        Ok((page_count, states))
    }

    async fn render(
        &self,
        pdf: &Path,
        params: &ExtractionParams,
        page_count: u32,
        range: PageRange,
        cache: &mut ImageCache,
    ) -> Result<RenderedPages> {
        let output_dir = cache.ensure()?.to_path_buf();
        let request = RenderRequest {
            pdf: pdf.to_path_buf(),
            output_dir,
            dpi: params.dpi,
            format: self.image_format,
            range,
            page_count,
            prefix: IMAGE_PREFIX.to_string(),
        };
        Ok(self.rasterizer.render(&request).await?)
    }

    /// OCR every page in `pages`, collected in ascending order.
    async fn recognize(
        &self,
        pages: &[u32],
        rendered: &RenderedPages,
        options: &OcrOptions,
    ) -> Result<BTreeMap<u32, String>> {
        let results: Vec<(u32, String)> = stream::iter(pages.iter().copied())
            .map(|page| async move {
                let image = rendered.image(page).ok_or(RasterizationError::MissingPage(page))?;
                let text = self.ocr.recognize(image, options).await?;
                debug!(page, chars = text.chars().count(), "page recognized");
                Ok::<_, PoppleractError>((page, text))
            })
            .buffered(self.ocr_concurrency)
            .try_collect()
            .await?;
        Ok(results.into_iter().collect())
    }
}

async fn check_input(pdf: &Path) -> Result<()> {
    match tokio::fs::metadata(pdf).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(PoppleractError::Config(format!("{} is not a regular file", pdf.display()))),
        Err(e) => Err(PoppleractError::Config(format!("cannot read {}: {}", pdf.display(), e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDirectExtractor, FakeOcr, FakeRasterizer};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const MACHINE_PAGE_1: &str = "Quarterly report, section one: revenue grew steadily.";
    const MACHINE_PAGE_3: &str = "Appendix: all figures are unaudited and provisional.";

    struct Fixture {
        _dir: tempfile::TempDir,
        pdf: PathBuf,
        cache_root: PathBuf,
        direct: Arc<FakeDirectExtractor>,
        rasterizer: Arc<FakeRasterizer>,
        ocr: Arc<FakeOcr>,
    }

    impl Fixture {
        fn new(direct: FakeDirectExtractor, rasterizer: FakeRasterizer, ocr: FakeOcr) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let pdf = dir.path().join("doc1.pdf");
            std::fs::write(&pdf, b"%PDF-1.5").unwrap();
            let cache_root = dir.path().join("imgs");
            Self {
                _dir: dir,
                pdf,
                cache_root,
                direct: Arc::new(direct),
                rasterizer: Arc::new(rasterizer),
                ocr: Arc::new(ocr),
            }
        }

        fn extractor(&self, preserve: bool) -> HybridExtractor {
            HybridExtractor::builder()
                .with_direct_extractor(self.direct.clone())
                .with_rasterizer(self.rasterizer.clone())
                .with_ocr(self.ocr.clone())
                .with_cache(&self.cache_root, preserve)
                .build()
        }

        fn cache_entries(&self) -> usize {
            std::fs::read_dir(&self.cache_root).map(|d| d.count()).unwrap_or(0)
        }
    }

    fn sources(output: &ExtractionOutput) -> Vec<PageSource> {
        output.pages.iter().map(PageResult::source).collect()
    }

    #[tokio::test]
    async fn test_mixed_document() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1, "  \n", MACHINE_PAGE_3]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(2, "TEST DOC 1\n"),
        );
        let params = ExtractionParams {
            minimum_chars_number: 20,
            dpi: 200,
            lang: "eng".to_string(),
            ..Default::default()
        };

        let output = fx.extractor(false).extract(&fx.pdf, &params).await.unwrap();

        assert_eq!(output.page_count, 3);
        assert_eq!(sources(&output), vec![PageSource::Direct, PageSource::Ocr, PageSource::Direct]);
        assert!(output.pages[1].text().contains("TEST"));
        assert_eq!(output.extracted_text.matches("<END_PAGE>").count(), 2);
        assert_eq!(
            output.extracted_text,
            format!("{MACHINE_PAGE_1}{PAGE_SEPARATOR}TEST DOC 1\n{PAGE_SEPARATOR}{MACHINE_PAGE_3}")
        );
        assert_eq!(output.num_extracted_chars, output.extracted_text.chars().count());
        assert_eq!(fx.rasterizer.requests(), vec![PageRange::new(2, 2)]);
        assert_eq!(fx.ocr.recognized(), vec![2]);
        assert_eq!(fx.cache_entries(), 0);
        assert_eq!(output.cache_dir, None);
    }

    #[tokio::test]
    async fn test_machine_readable_document_never_touches_ocr() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1, MACHINE_PAGE_3]),
            FakeRasterizer::new(),
            FakeOcr::new(),
        );

        let output = fx.extractor(true).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();

        assert_eq!(sources(&output), vec![PageSource::Direct, PageSource::Direct]);
        assert_eq!(fx.rasterizer.calls(), 0);
        assert_eq!(fx.ocr.calls(), 0);
        assert!(!fx.cache_root.exists());
        assert_eq!(output.cache_dir, None);
    }

    #[tokio::test]
    async fn test_scanned_document_is_fully_ocred() {
        let fx = Fixture::new(
            FakeDirectExtractor::new(["", "", " "]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(1, "one").with_page(2, "two").with_page(3, "three"),
        );

        let output = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();

        assert_eq!(sources(&output), vec![PageSource::Ocr; 3]);
        let texts: Vec<&str> = output.pages.iter().map(PageResult::text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(fx.rasterizer.requests(), vec![PageRange::all(3)]);
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let exactly = "a".repeat(20);
        let one_short = "b".repeat(19);
        let fx = Fixture::new(
            FakeDirectExtractor::new([format!("  {exactly}\n"), one_short]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(2, "recognized"),
        );

        let output = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();

        assert_eq!(sources(&output), vec![PageSource::Direct, PageSource::Ocr]);
        assert_eq!(output.pages[0].text(), format!("  {exactly}\n"));
    }

    #[tokio::test]
    async fn test_threshold_counts_characters_not_bytes() {
        // 20 characters, 40 bytes.
        let fx = Fixture::new(
            FakeDirectExtractor::new(["żółćżółćżółćżółćżółć"]),
            FakeRasterizer::new(),
            FakeOcr::new(),
        );
        let params = ExtractionParams { minimum_chars_number: 21, ..Default::default() };

        let output = fx.extractor(false).extract(&fx.pdf, &params).await.unwrap();
        assert_eq!(sources(&output), vec![PageSource::Ocr]);
    }

    #[tokio::test]
    async fn test_marker_count_matches_page_count() {
        for pages in 1..=5u32 {
            let direct: Vec<String> = (1..=pages)
                .map(|p| if p % 2 == 0 { String::new() } else { MACHINE_PAGE_1.to_string() })
                .collect();
            let ocr = (2..=pages)
                .step_by(2)
                .fold(FakeOcr::new(), |ocr, p| ocr.with_page(p, format!("ocr {p}")));
            let fx = Fixture::new(FakeDirectExtractor::new(direct), FakeRasterizer::new(), ocr);

            let output = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();
            assert_eq!(output.extracted_text.matches(PAGE_SEPARATOR).count(), pages as usize - 1);
            assert_eq!(output.extracted_text.split(PAGE_SEPARATOR).count(), pages as usize);
            assert!(!output.extracted_text.ends_with(PAGE_SEPARATOR));
        }
    }

    #[tokio::test]
    async fn test_dropped_extraction_removes_cache() {
        let fx = Fixture::new(
            FakeDirectExtractor::new(["", MACHINE_PAGE_1]),
            FakeRasterizer::new(),
            FakeOcr::new()
                .with_page(1, "never returned")
                .with_delay(1, Duration::from_secs(5)),
        );
        let extractor = fx.extractor(false);
        let params = ExtractionParams::default();

        let result =
            tokio::time::timeout(Duration::from_millis(100), extractor.extract(&fx.pdf, &params)).await;

        assert!(result.is_err(), "extraction should still be waiting on OCR");
        assert_eq!(fx.ocr.recognized(), vec![1]);
        assert!(fx.cache_root.is_dir());
        assert_eq!(fx.cache_entries(), 0);
    }

    #[tokio::test]
    async fn test_page_order_preserved() {
        let fx = Fixture::new(
            FakeDirectExtractor::new(["", "page two has plenty of direct text", "", ""]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(1, "page one").with_page(3, "page three").with_page(4, "page four"),
        );

        let output = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();

        let text = &output.extracted_text;
        let positions: Vec<usize> = ["page one", "page two", "page three", "page four"]
            .iter()
            .map(|needle| text.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fx.rasterizer.requests(), vec![PageRange::new(1, 4)]);
        assert_eq!(fx.ocr.recognized(), vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_parallel_ocr_keeps_order() {
        let fx = Fixture::new(
            FakeDirectExtractor::new(["", "", ""]),
            FakeRasterizer::new(),
            FakeOcr::new()
                .with_page(1, "first")
                .with_delay(1, Duration::from_millis(80))
                .with_page(2, "second")
                .with_delay(2, Duration::from_millis(40))
                .with_page(3, "third"),
        );
        let extractor = HybridExtractor::builder()
            .with_direct_extractor(fx.direct.clone())
            .with_rasterizer(fx.rasterizer.clone())
            .with_ocr(fx.ocr.clone())
            .with_cache(&fx.cache_root, false)
            .with_ocr_concurrency(3)
            .build();

        let output = extractor.extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();
        assert_eq!(
            output.extracted_text,
            ["first", "second", "third"].join(PAGE_SEPARATOR)
        );
    }

    #[tokio::test]
    async fn test_page_count_mismatch() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1, MACHINE_PAGE_3]).with_page_count(3),
            FakeRasterizer::new(),
            FakeOcr::new(),
        );

        let err = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap_err();

        assert!(matches!(err, PoppleractError::PageCountMismatch { expected: 3, found: 2 }));
        assert_eq!(fx.rasterizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_idempotent_runs_leave_no_cache() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1, ""]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(2, "scanned"),
        );
        let extractor = fx.extractor(false);

        let first = extractor.extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();
        let second = extractor.extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();

        assert_eq!(first.extracted_text, second.extracted_text);
        assert_eq!(fx.cache_entries(), 0);
        assert_eq!(fx.rasterizer.calls(), 2);
    }

    #[tokio::test]
    async fn test_preserved_cache_is_reported() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([""]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(1, "scanned"),
        );

        let output = fx.extractor(true).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap();

        let cache_dir = output.cache_dir.expect("cache should be preserved");
        assert!(cache_dir.starts_with(&fx.cache_root));
        assert!(cache_dir.join("pag-01.png").is_file());
    }

    #[tokio::test]
    async fn test_ocr_failure_aborts_and_cleans_up() {
        let fx = Fixture::new(
            FakeDirectExtractor::new(["", MACHINE_PAGE_1, ""]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(1, "fine").failing_on(3),
        );

        let err = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap_err();

        assert!(matches!(err, PoppleractError::Ocr(_)));
        assert!(fx.cache_root.is_dir());
        assert_eq!(fx.cache_entries(), 0);
    }

    #[tokio::test]
    async fn test_rasterization_failure_cleans_up() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([""]),
            FakeRasterizer::new().failing(),
            FakeOcr::new(),
        );

        let err = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap_err();

        assert!(matches!(err, PoppleractError::Rasterization(_)));
        assert_eq!(fx.cache_entries(), 0);
        assert_eq!(fx.ocr.calls(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1]).failing(),
            FakeRasterizer::new(),
            FakeOcr::new(),
        );

        let err = fx.extractor(false).extract(&fx.pdf, &ExtractionParams::default()).await.unwrap_err();
        assert!(matches!(err, PoppleractError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_invalid_params_spawn_nothing() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1]),
            FakeRasterizer::new(),
            FakeOcr::new(),
        );
        let params = ExtractionParams { psm: 42, ..Default::default() };

        let err = fx.extractor(false).extract(&fx.pdf, &params).await.unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(fx.direct.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1]),
            FakeRasterizer::new(),
            FakeOcr::new(),
        );

        let err = fx
            .extractor(false)
            .extract(Path::new("/nonexistent/doc.pdf"), &ExtractionParams::default())
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(fx.direct.calls(), 0);
    }

    #[tokio::test]
    async fn test_direct_strategy_accepts_everything() {
        let fx = Fixture::new(
            FakeDirectExtractor::new(["short", ""]),
            FakeRasterizer::new(),
            FakeOcr::new(),
        );
        let params = ExtractionParams { strategy: Strategy::Direct, ..Default::default() };

        let output = fx.extractor(false).extract(&fx.pdf, &params).await.unwrap();

        assert_eq!(output.extracted_text, format!("short{PAGE_SEPARATOR}"));
        assert_eq!(sources(&output), vec![PageSource::Direct, PageSource::Direct]);
        assert_eq!(fx.rasterizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_ocr_strategy_skips_direct_extraction() {
        let fx = Fixture::new(
            FakeDirectExtractor::new([MACHINE_PAGE_1, MACHINE_PAGE_3]),
            FakeRasterizer::new(),
            FakeOcr::new().with_page(1, "ocr one").with_page(2, "ocr two"),
        );
        let params = ExtractionParams { strategy: Strategy::Ocr, ..Default::default() };

        let output = fx.extractor(false).extract(&fx.pdf, &params).await.unwrap();

        assert_eq!(output.extracted_text, format!("ocr one{PAGE_SEPARATOR}ocr two"));
        assert_eq!(fx.direct.calls(), 0);
        assert_eq!(fx.rasterizer.requests(), vec![PageRange::all(2)]);
    }

    #[test]
    fn test_meets_threshold() {
        assert!(meets_threshold("  abc  ", 3));
        assert!(!meets_threshold("  ab \n", 3));
        assert!(meets_threshold("", 0));
    }
}
