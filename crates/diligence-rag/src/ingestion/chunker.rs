//! Document chunking with page and position tracking

use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::ocr::PageRecognizer;
use super::parser::{ExtractedText, FileParser};
use super::splitter::RecursiveSplitter;
use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{ChunkDraft, DocumentFormat};

/// Parses one document into ordered chunk drafts
///
/// Blocking: PDF extraction and page recognition run synchronously, so
/// async callers should go through `spawn_blocking`.
#[derive(Clone)]
pub struct Chunker {
    splitter: RecursiveSplitter,
    recognizer: Option<Arc<dyn PageRecognizer>>,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            splitter: RecursiveSplitter::new(config.chunk_size, config.chunk_overlap),
            recognizer: None,
        }
    }

    /// Use a recognizer for PDF pages without a text layer
    pub fn with_recognizer(mut self, recognizer: Arc<dyn PageRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Parse raw bytes of a known format into chunks
    ///
    /// Fails with `FileParse` for corrupt input and `NoContent` when no page
    /// yields any text, even after recognition.
    pub fn parse(&self, filename: &str, data: &[u8], format: DocumentFormat) -> Result<Vec<ChunkDraft>> {
        let extracted = FileParser::extract(filename, data, format)?;
        self.chunk_extracted(filename, extracted, data)
    }

    /// Run page recognition on blank pages, then split every page
    pub fn chunk_extracted(
        &self,
        filename: &str,
        mut extracted: ExtractedText,
        data: &[u8],
    ) -> Result<Vec<ChunkDraft>> {
        if extracted.format.is_paginated() {
            self.recognize_blank_pages(filename, &mut extracted, data);
        }

        let mut drafts = Vec::new();
        for page in &extracted.pages {
            for text in self.splitter.split(&page.text) {
                let (char_start, char_end) = locate(&page.text, &text);
                drafts.push(ChunkDraft {
                    content_hash: content_hash(&text),
                    token_count: token_count(&text),
                    page_number: page.page_number,
                    char_start,
                    char_end,
                    text,
                });
            }
        }

        if drafts.is_empty() {
            return Err(Error::NoContent(filename.to_string()));
        }

        tracing::debug!(
            "{}: {} chunks from {} page(s)",
            filename,
            drafts.len(),
            extracted.pages.len()
        );
        Ok(drafts)
    }

    fn recognize_blank_pages(&self, filename: &str, extracted: &mut ExtractedText, data: &[u8]) {
        let Some(recognizer) = &self.recognizer else {
            return;
        };

        let blank: Vec<u32> = extracted.blank_pages().collect();
        for page_number in blank {
            let Some(page) = extracted
                .pages
                .iter_mut()
                .find(|p| p.page_number == Some(page_number))
            else {
                continue;
            };

            match recognizer.recognize_page(data, page_number) {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!(
                        "{}: recognized {} chars on scanned page {} via {}",
                        filename,
                        text.len(),
                        page_number,
                        recognizer.name()
                    );
                    page.text = text;
                }
                Ok(_) => {
                    tracing::warn!("{}: page {} is blank after recognition", filename, page_number);
                }
                Err(e) => {
                    tracing::warn!(
                        "{}: recognition failed on page {}, treating as empty: {}",
                        filename,
                        page_number,
                        e
                    );
                }
            }
        }
    }
}

/// First 16 hex chars of the SHA-256 of the chunk text
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(16);
    hash
}

/// Whitespace-delimited word count
pub fn token_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Char span of the first occurrence of `chunk` in `source`.
///
/// A chunk whose text also appears earlier in the source is attributed to
/// the earlier occurrence.
fn locate(source: &str, chunk: &str) -> (usize, usize) {
    let len = chunk.chars().count();
    match source.find(chunk) {
        Some(byte_idx) => {
            let start = source[..byte_idx].chars().count();
            (start, start + len)
        }
        None => (0, len),
    }
}
