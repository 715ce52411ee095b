//! OCR bridge: geometry written next to the input by an external OCR tool.

use crate::interchange::read_layout;
use docanon_core::{ExtractionError, Extractor, PageWords};
use std::path::{Path, PathBuf};

pub const SIDECAR_SUFFIX: &str = ".geometry.xml";

/// `<input>.geometry.xml`
pub fn sidecar_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Reads the interchange file that sits next to the input document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarExtractor;

impl Extractor for SidecarExtractor {
    fn extract(&self, input: &Path) -> Result<Vec<PageWords>, ExtractionError> {
        let path = sidecar_path(input);
        if !path.is_file() {
            return Err(ExtractionError::MissingSource(path));
        }
        let xml = std::fs::read_to_string(&path).map_err(|e| ExtractionError::Unreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let layout = read_layout(&xml)
            .map_err(|e| ExtractionError::InvalidGeometry(format!("{}: {}", path.display(), e)))?;

        if layout.word_count() == 0 {
            return Err(ExtractionError::NoText(path));
        }
        log::info!(
            "[Sidecar] {}: {} pages, {} words",
            path.display(),
            layout.pages.len(),
            layout.word_count()
        );
        Ok(layout.into_page_words())
    }
}
