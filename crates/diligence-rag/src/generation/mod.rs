//! Answer generation with citation extraction

pub mod citation;
mod generator;
pub mod prompt;

pub use citation::{extract_citations, truncate_excerpt};
pub use generator::{AnswerGenerator, GeneratedAnswer};
pub use prompt::PromptBuilder;
