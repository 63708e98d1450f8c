//! OCR through the `tesseract` command-line tool.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::{OcrOptions, OcrRunner};
use crate::error::{OcrError, ToolError};
use crate::models::config::ToolConfig;
use crate::tool::ToolCommand;

/// [`OcrRunner`] running `tesseract <image> stdout`.
#[derive(Debug, Clone)]
pub struct TesseractRunner {
    tool: ToolConfig,
}

impl TesseractRunner {
    pub fn new(tool: ToolConfig) -> Self {
        Self { tool }
    }

    fn command(&self, image: &Path, options: &OcrOptions) -> ToolCommand {
        let mut command = self
            .tool
            .command()
            .arg(image)
            .arg("stdout")
            .args(["-l", options.lang.as_str()])
            .arg("--oem")
            .arg(options.oem.to_string())
            .arg("--psm")
            .arg(options.psm.to_string())
            .arg("--dpi")
            .arg(options.dpi.to_string())
            .arg("-c")
            .arg(format!("thresholding_method={}", options.thresholding_method))
            .arg("-c")
            .arg(format!(
                "preserve_interword_spaces={}",
                u8::from(options.preserve_interword_spaces)
            ));
        if let Some(dir) = &options.tessdata_dir {
            command = command.arg("--tessdata-dir").arg(dir);
        }
        command
    }

    /// Languages tesseract reports as installed (`--list-langs`).
    pub async fn list_languages(&self, tessdata_dir: Option<&Path>) -> Result<Vec<String>, ToolError> {
        let mut command = self.tool.command();
        if let Some(dir) = tessdata_dir {
            command = command.arg("--tessdata-dir").arg(dir);
        }
        let output = command.arg("--list-langs").run().await?;
        Ok(parse_language_list(&output.stdout_text()))
    }

    async fn check_image(image: &Path) -> Result<(), OcrError> {
        if !tokio::fs::try_exists(image).await.unwrap_or(false) {
            return Err(OcrError::ImageNotFound(image.to_path_buf()));
        }
        let path = image.to_path_buf();
        let dimensions = tokio::task::spawn_blocking(move || image::image_dimensions(&path))
            .await
            .map_err(|e| OcrError::InvalidImage {
                path: image.to_path_buf(),
                reason: e.to_string(),
            })?;
        match dimensions {
            Ok((0, _)) | Ok((_, 0)) => Err(OcrError::InvalidImage {
                path: image.to_path_buf(),
                reason: "image has no pixels".to_string(),
            }),
            Ok(_) => Ok(()),
            Err(e) => Err(OcrError::InvalidImage {
                path: image.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    async fn check_languages(options: &OcrOptions) -> Result<(), OcrError> {
        let Some(dir) = &options.tessdata_dir else {
            return Ok(());
        };
        for lang in options.languages() {
            let traineddata = dir.join(format!("{lang}.traineddata"));
            if !tokio::fs::try_exists(&traineddata).await.unwrap_or(false) {
                return Err(OcrError::LanguageUnavailable {
                    lang: lang.to_string(),
                    tessdata_dir: dir.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for TesseractRunner {
    fn default() -> Self {
        Self::new(ToolConfig::new("tesseract", 120))
    }
}

#[async_trait]
impl OcrRunner for TesseractRunner {
    async fn recognize(&self, image: &Path, options: &OcrOptions) -> Result<String, OcrError> {
        Self::check_image(image).await?;
        Self::check_languages(options).await?;

        let output = self.command(image, options).run().await?;
        let text = output.stdout_text();
        debug!(
            image = %image.display(),
            lang = %options.lang,
            chars = text.chars().count(),
            "tesseract finished"
        );
        Ok(text)
    }
}

fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn args(command: &ToolCommand) -> Vec<String> {
        command
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_command_line() {
        let runner = TesseractRunner::default();
        let options = OcrOptions {
            lang: "eng+ita".to_string(),
            ..Default::default()
        };
        let command = runner.command(Path::new("/cache/doc/pag-2.png"), &options);
        assert_eq!(command.program(), "tesseract");
        assert_eq!(
            args(&command),
            vec![
                "/cache/doc/pag-2.png",
                "stdout",
                "-l",
                "eng+ita",
                "--oem",
                "3",
                "--psm",
                "3",
                "--dpi",
                "200",
                "-c",
                "thresholding_method=0",
                "-c",
                "preserve_interword_spaces=1",
            ]
        );
    }

    #[test]
    fn test_command_line_with_tessdata() {
        let runner = TesseractRunner::default();
        let options = OcrOptions {
            psm: 6,
            thresholding_method: 2,
            preserve_interword_spaces: false,
            tessdata_dir: Some(PathBuf::from("/usr/local/share/tessdata")),
            ..Default::default()
        };
        let args = args(&runner.command(Path::new("pag-1.png"), &options));
        assert!(args.contains(&"preserve_interword_spaces=0".to_string()));
        assert!(args.contains(&"thresholding_method=2".to_string()));
        assert_eq!(
            args[args.len() - 2..].to_vec(),
            vec!["--tessdata-dir", "/usr/local/share/tessdata"]
        );
    }

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nita\nosd\n";
        assert_eq!(parse_language_list(output), vec!["eng", "ita", "osd"]);
    }

    #[tokio::test]
    async fn test_missing_image() {
        let runner = TesseractRunner::default();
        let err = runner
            .recognize(Path::new("/nonexistent/pag-1.png"), &OcrOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::ImageNotFound(_)));
    }

    #[tokio::test]
    async fn test_corrupt_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pag-1.png");
        std::fs::write(&path, b"not a png at all").unwrap();

        let err = TesseractRunner::default()
            .recognize(&path, &OcrOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage { .. }));
    }

    #[tokio::test]
    async fn test_missing_language_pack() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("pag-1.png");
        image::RgbImage::new(8, 8).save(&image_path).unwrap();

        let tessdata = dir.path().join("tessdata");
        std::fs::create_dir(&tessdata).unwrap();
        std::fs::write(tessdata.join("eng.traineddata"), b"").unwrap();

        let options = OcrOptions {
            lang: "eng+ita".to_string(),
            tessdata_dir: Some(tessdata),
            ..Default::default()
        };
        let err = TesseractRunner::new(ToolConfig::new("poppleract-no-such-tool", 5))
            .recognize(&image_path, &options)
            .await
            .unwrap_err();
        match err {
            OcrError::LanguageUnavailable { lang, .. } => assert_eq!(lang, "ita"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
