//! Text extraction for the supported document formats

use crate::error::{Error, Result};
use crate::types::DocumentFormat;

/// Text of one page (or the whole document for single-span formats)
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// Page number (1-indexed); `None` for single-span formats
    pub page_number: Option<u32>,
    pub text: String,
}

/// Extracted text, ready for splitting
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub format: DocumentFormat,
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    /// Single-span text
    pub fn single(format: DocumentFormat, text: impl Into<String>) -> Self {
        Self {
            format,
            pages: vec![PageText {
                page_number: None,
                text: text.into(),
            }],
        }
    }

    /// Page-oriented text; pages are numbered from 1 in the given order
    pub fn paginated(format: DocumentFormat, pages: Vec<String>) -> Self {
        Self {
            format,
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| PageText {
                    page_number: Some(i as u32 + 1),
                    text,
                })
                .collect(),
        }
    }

    /// Pages with no extractable text
    pub fn blank_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages
            .iter()
            .filter(|p| p.text.trim().is_empty())
            .filter_map(|p| p.page_number)
    }
}

/// Normalise PDF text: drop NULs, expand ligatures, flatten typographic punctuation
fn cleanup_pdf_text(text: &str) -> String {
    let text = text
        .replace('\0', "")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ");

    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-format text extractor
pub struct FileParser;

impl FileParser {
    /// Extract text from raw bytes of a known format
    pub fn extract(filename: &str, data: &[u8], format: DocumentFormat) -> Result<ExtractedText> {
        match format {
            DocumentFormat::Pdf => Self::parse_pdf(filename, data),
            DocumentFormat::Docx => Self::parse_docx(filename, data),
            DocumentFormat::Txt | DocumentFormat::Markdown => Self::parse_text(filename, data, format),
        }
    }

    /// Detect the format from the filename, then extract
    pub fn parse(filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let format = DocumentFormat::from_filename(filename)
            .ok_or_else(|| Error::UnsupportedFormat(filename.to_string()))?;
        Self::extract(filename, data, format)
    }

    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Invalid PDF: {}", e)))?;

        if doc.is_encrypted() {
            return Err(Error::file_parse(filename, "PDF is encrypted"));
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(Error::file_parse(filename, "PDF has no pages"));
        }

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_number in page_numbers {
            // A page whose text layer cannot be decoded is treated as blank so
            // the recognizer gets a chance at it.
            let text = match doc.extract_text(&[page_number]) {
                Ok(raw) => cleanup_pdf_text(&raw),
                Err(e) => {
                    tracing::debug!("{}: no text layer on page {}: {}", filename, page_number, e);
                    String::new()
                }
            };
            pages.push(text);
        }

        Ok(ExtractedText::paginated(DocumentFormat::Pdf, pages))
    }

    fn parse_docx(filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            }
        }

        Ok(ExtractedText::single(DocumentFormat::Docx, paragraphs.join("\n\n")))
    }

    fn parse_text(filename: &str, data: &[u8], format: DocumentFormat) -> Result<ExtractedText> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::file_parse(filename, format!("Invalid UTF-8: {}", e)))?;
        Ok(ExtractedText::single(format, text.trim_start_matches('\u{FEFF}')))
    }
}
