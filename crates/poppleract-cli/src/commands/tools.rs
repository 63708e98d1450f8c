//! Tools command - check that the external programs are usable.

use clap::Args;
use console::style;

use poppleract_core::models::config::ToolConfig;
use poppleract_core::TesseractRunner;

use super::load_config;

/// Arguments for the tools command.
#[derive(Args)]
pub struct ToolsArgs {
    /// Skip listing installed tesseract languages
    #[arg(long)]
    no_languages: bool,
}

pub async fn run(args: ToolsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tools = &config.tools;

    let checks = [
        (&tools.pdftotext, "-v"),
        (&tools.pdftocairo, "-v"),
        (&tools.tesseract, "--version"),
        (&tools.pdfinfo, "-v"),
    ];

    let mut missing = 0;
    for (tool, version_flag) in checks {
        if !check_tool(tool, version_flag).await {
            missing += 1;
        }
    }

    if !args.no_languages {
        let runner = TesseractRunner::new(tools.tesseract.clone());
        match runner.list_languages(config.extraction.tessdata_dir.as_deref()).await {
            Ok(langs) if langs.is_empty() => {
                println!("{} No tesseract languages installed", style("!").yellow());
            }
            Ok(langs) => println!("{} Tesseract languages: {}", style("ℹ").blue(), langs.join(", ")),
            Err(e) => println!("{} Could not list tesseract languages: {}", style("✗").red(), e),
        }
    }

    if missing > 0 {
        anyhow::bail!("{} of {} tools unavailable", missing, checks.len());
    }

    Ok(())
}

async fn check_tool(tool: &ToolConfig, version_flag: &str) -> bool {
    match tool.command().arg(version_flag).probe().await {
        Ok(version) => {
            println!("{} {:<12} {}", style("✓").green(), tool.program, version);
            true
        }
        Err(e) => {
            println!("{} {:<12} {}", style("✗").red(), tool.program, e);
            false
        }
    }
}
