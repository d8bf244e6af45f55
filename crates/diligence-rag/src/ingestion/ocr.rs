//! Scanned-page text recognition (pdftoppm + tesseract)

use std::process::Command;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// Recognizes text on one rendered page of a PDF
///
/// Called from the blocking thread pool, so implementations may block.
pub trait PageRecognizer: Send + Sync {
    /// Recognize the text of `page_number` (1-indexed) of the given PDF
    fn recognize_page(&self, pdf: &[u8], page_number: u32) -> Result<String>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Page recognizer that shells out to poppler's `pdftoppm` and `tesseract`
pub struct TesseractRecognizer {
    dpi: u32,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            dpi: config.dpi,
            language: config.language.clone(),
        }
    }

    /// Check if tesseract is installed
    pub fn has_tesseract() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Check if pdftoppm is installed (`-v` prints to stderr and may exit non-zero)
    pub fn has_pdftoppm() -> bool {
        Command::new("pdftoppm").arg("-v").output().is_ok()
    }

    pub fn is_available() -> bool {
        Self::has_pdftoppm() && Self::has_tesseract()
    }
}

impl PageRecognizer for TesseractRecognizer {
    fn recognize_page(&self, pdf: &[u8], page_number: u32) -> Result<String> {
        let temp_dir = tempfile::tempdir()?;
        let pdf_path = temp_dir.path().join("input.pdf");
        std::fs::write(&pdf_path, pdf)?;

        let image_stem = temp_dir.path().join("page");
        let page = page_number.to_string();
        let dpi = self.dpi.to_string();

        let render = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .args(["-f", &page, "-l", &page, "-r", &dpi])
            .arg(&pdf_path)
            .arg(&image_stem)
            .output()
            .map_err(|e| Error::internal(format!("pdftoppm failed: {}", e)))?;

        if !render.status.success() {
            let stderr = String::from_utf8_lossy(&render.stderr);
            return Err(Error::internal(format!("pdftoppm error on page {}: {}", page_number, stderr)));
        }

        let image_path = image_stem.with_extension("png");
        if !image_path.exists() {
            return Err(Error::internal(format!("pdftoppm produced no image for page {}", page_number)));
        }

        let ocr = Command::new("tesseract")
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|e| Error::internal(format!("tesseract failed on page {}: {}", page_number, e)))?;

        if !ocr.status.success() {
            let stderr = String::from_utf8_lossy(&ocr.stderr);
            return Err(Error::internal(format!("tesseract error on page {}: {}", page_number, stderr)));
        }

        let text = String::from_utf8_lossy(&ocr.stdout).trim().to_string();
        tracing::debug!("OCR recognized {} characters on page {}", text.len(), page_number);
        Ok(text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
