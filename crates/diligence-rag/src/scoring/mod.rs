//! Confidence scoring

mod grade;
mod scorer;

pub use grade::{GradeResponse, NEUTRAL_SCORE};
pub use scorer::{
    ConfidenceScorer, COVERAGE_WEIGHT, FAITHFULNESS_WEIGHT, RELEVANCY_WEIGHT, RETRIEVAL_WEIGHT,
};
