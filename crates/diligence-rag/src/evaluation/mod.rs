//! Offline evaluation against reference answers

mod evaluator;
pub mod lexical;

pub use evaluator::{EvaluationMetrics, EvaluationOutcome, Evaluator};
