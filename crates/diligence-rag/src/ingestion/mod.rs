//! Document ingestion: text extraction, scanned-page recognition and chunking

mod chunker;
pub mod ocr;
mod parser;
mod splitter;

pub use chunker::{content_hash, token_count, Chunker};
pub use ocr::{PageRecognizer, TesseractRecognizer};
pub use parser::{ExtractedText, FileParser, PageText};
pub use splitter::{RecursiveSplitter, DEFAULT_SEPARATORS};
