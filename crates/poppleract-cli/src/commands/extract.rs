//! Extract command - extract the text of a single PDF.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use poppleract_core::HybridExtractor;

use super::{load_config, ExtractionSummary, ParamArgs};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a JSON summary instead of plain text
    #[arg(long)]
    json: bool,

    /// Keep the rendered page images
    #[arg(long)]
    preserve_cache: bool,

    #[command(flatten)]
    params: ParamArgs,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.preserve_cache {
        config.cache.preserve = true;
    }
    let params = args.params.resolve(&config.extraction);

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting text from {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Extracting {} ({})", args.input.display(), params.strategy));
    pb.enable_steady_tick(Duration::from_millis(120));

    let extractor = HybridExtractor::from_config(&config);
    let result = extractor.extract(&args.input, &params).await;
    pb.finish_and_clear();
    let output = result?;

    let page_count = output.page_count;
    let ocr_pages = output.ocr_page_count();
    if let Some(dir) = &output.cache_dir {
        eprintln!("{} Page images kept in {}", style("ℹ").blue(), dir.display());
    }

    let content = if args.json {
        let file_name = args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = fs::metadata(&args.input)?.len();
        serde_json::to_string_pretty(&ExtractionSummary::new(file_name, size, output))?
    } else {
        output.extracted_text
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &content)?;
        eprintln!(
            "{} {} pages ({} OCR) written to {}",
            style("✓").green(),
            page_count,
            ocr_pages,
            output_path.display()
        );
    } else {
        println!("{}", content);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
