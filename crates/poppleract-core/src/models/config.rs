//! Configuration structures for the extraction service.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PoppleractError, Result};
use crate::models::params::ExtractionParams;
use crate::pdf::RenderFormat;
use crate::tool::ToolCommand;

/// Main configuration for poppleract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoppleractConfig {
    /// Default extraction parameters, overridable per request.
    pub extraction: ExtractionParams,

    /// External tool locations and limits.
    pub tools: ToolsConfig,

    /// Rendered page image cache.
    pub cache: CacheConfig,

    /// HTTP service settings.
    pub server: ServerConfig,
}

/// A single external program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Program name or path.
    pub program: String,

    /// Kill the process after this many seconds.
    pub timeout_secs: u64,
}

impl ToolConfig {
    pub fn new(program: &str, timeout_secs: u64) -> Self {
        Self {
            program: program.to_string(),
            timeout_secs,
        }
    }

    /// A command for this program, without arguments.
    pub fn command(&self) -> ToolCommand {
        ToolCommand::new(self.program.clone(), Duration::from_secs(self.timeout_secs))
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// poppler `pdftotext`; timeout covers the whole document.
    pub pdftotext: ToolConfig,

    /// poppler `pdftocairo`; timeout covers one rendering call.
    pub pdftocairo: ToolConfig,

    /// `tesseract`; timeout covers one page.
    pub tesseract: ToolConfig,

    /// poppler `pdfinfo`, counts pages of files lopdf cannot parse.
    pub pdfinfo: ToolConfig,

    /// Pages recognized concurrently within one document.
    pub ocr_concurrency: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pdftotext: ToolConfig::new("pdftotext", 120),
            pdftocairo: ToolConfig::new("pdftocairo", 300),
            tesseract: ToolConfig::new("tesseract", 120),
            pdfinfo: ToolConfig::new("pdfinfo", 60),
            ocr_concurrency: 1,
        }
    }
}

/// Page image cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root under which each run creates its own directory.
    pub dir: PathBuf,

    /// Keep rendered images after the run.
    pub preserve: bool,

    /// Format of rendered page images.
    pub image_format: RenderFormat,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("poppleract"),
            preserve: false,
            image_format: RenderFormat::Png,
        }
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Largest accepted upload, in megabytes.
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_mb: 64,
        }
    }
}

impl PoppleractConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PoppleractError::Config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PoppleractError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        for tool in [
            &self.tools.pdftotext,
            &self.tools.pdftocairo,
            &self.tools.tesseract,
            &self.tools.pdfinfo,
        ] {
            if tool.program.trim().is_empty() {
                return Err(PoppleractError::Config("tool program must not be empty".to_string()));
            }
            if tool.timeout_secs == 0 {
                return Err(PoppleractError::Config(format!(
                    "timeout for {} must be positive",
                    tool.program
                )));
            }
        }
        if self.tools.ocr_concurrency == 0 {
            return Err(PoppleractError::Config("ocr_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}
