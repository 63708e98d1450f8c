//! Batch command - extract the text of many PDFs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use poppleract_core::{ExtractionParams, HybridExtractor};

use super::{load_config, ParamArgs};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory for `<name>.txt` files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    #[command(flatten)]
    params: ParamArgs,
}

/// Result of extracting a single file.
struct BatchResult {
    path: PathBuf,
    ocr_pages: usize,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let params = args.params.resolve(&config.extraction);

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_pdf(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No PDF files found for pattern: {}", args.input);
    }

    eprintln!("{} Found {} files to process", style("ℹ").blue(), files.len());

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let extractor = HybridExtractor::from_config(&config);
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        match extract_one(&extractor, &path, &args.output_dir, &params).await {
            Ok(ocr_pages) => results.push(BatchResult {
                path,
                ocr_pages,
                error: None,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(BatchResult {
                        path,
                        ocr_pages: 0,
                        error: Some(error_msg),
                    });
                } else {
                    pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let succeeded = results.len() - failed.len();
    let ocr_pages: usize = results.iter().map(|r| r.ocr_pages).sum();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed, {} pages OCR'd",
        style(succeeded).green(),
        style(failed.len()).red(),
        ocr_pages
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn extract_one(
    extractor: &HybridExtractor,
    path: &Path,
    output_dir: &Path,
    params: &ExtractionParams,
) -> anyhow::Result<usize> {
    let output = extractor.extract(path, params).await?;
    let output_path = output_path(output_dir, path);
    fs::write(&output_path, &output.extracted_text)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(output.ocr_page_count())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// `<output_dir>/<stem>.txt` for an input PDF.
fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    output_dir.join(format!("{}.txt", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("a/report.pdf")));
        assert!(is_pdf(Path::new("SCAN.PDF")));
        assert!(!is_pdf(Path::new("notes.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/out"), Path::new("/in/report.v2.pdf")),
            PathBuf::from("/out/report.v2.txt")
        );
    }
}
