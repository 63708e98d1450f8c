//! Scoped directory for rendered page images.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Image cache owned by exactly one extraction run.
///
/// The directory is created on first use under a shared root, with a unique
/// name so concurrent runs never collide. Dropping the cache removes the
/// directory unless it was built with `preserve` set.
#[derive(Debug)]
pub struct ImageCache {
    root: PathBuf,
    label: String,
    preserve: bool,
    dir: Option<TempDir>,
}

impl ImageCache {
    pub fn new(root: impl Into<PathBuf>, label: impl Into<String>, preserve: bool) -> Self {
        Self {
            root: root.into(),
            label: label.into(),
            preserve,
            dir: None,
        }
    }

    /// Cache for one document, labelled with the document's stem.
    pub fn for_document(root: impl Into<PathBuf>, pdf: &Path, preserve: bool) -> Self {
        Self::new(root, document_stem(pdf), preserve)
    }

    /// Path of the directory, creating it on first call.
    pub fn ensure(&mut self) -> std::io::Result<&Path> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => {
                std::fs::create_dir_all(&self.root)?;
                let dir = tempfile::Builder::new()
                    .prefix(&format!("{}-", self.label))
                    .keep(self.preserve)
                    .tempdir_in(&self.root)?;
                debug!("created image cache {}", dir.path().display());
                dir
            }
        };
        Ok(self.dir.insert(dir).path())
    }

    pub fn is_created(&self) -> bool {
        self.dir.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    pub fn preserve(&self) -> bool {
        self.preserve
    }

    /// End the run: returns the directory if it was created and is kept.
    pub fn finish(mut self) -> Option<PathBuf> {
        let kept = if self.preserve { self.path().map(Path::to_path_buf) } else { None };
        if let Some(path) = &kept {
            info!("image cache preserved at {}", path.display());
        }
        self.release();
        kept
    }

    fn release(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.preserve {
            // Built with `keep`, dropping leaves the directory in place.
            drop(dir);
            return;
        }
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!("removed image cache {}", path.display()),
            Err(e) => warn!("failed to remove image cache {}: {}", path.display(), e),
        }
    }
}

impl Drop for ImageCache {
    fn drop(&mut self) {
        self.release();
    }
}

/// File name with every extension removed (`scan.v2.pdf` becomes `scan`).
pub fn document_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match name.find('.') {
        Some(0) | None => name.as_str(),
        Some(idx) => &name[..idx],
    };
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}
