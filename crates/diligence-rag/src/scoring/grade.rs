//! Parsed grader replies

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Score used when a grade cannot be obtained
pub const NEUTRAL_SCORE: f32 = 0.5;

/// A grader reply reduced to its numeric score, if it had one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResponse {
    /// Raw model output, kept for logging
    pub raw: String,
    /// Parsed score, clamped to [0, 1]; `None` when the reply was not a finite number
    pub score: Option<f32>,
}

impl GradeResponse {
    /// The grader is asked to reply with only the number
    pub fn parse(raw: &str) -> Self {
        let score = raw
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 1.0));

        Self {
            raw: raw.to_string(),
            score,
        }
    }

    /// The score, or `GradingDegraded` when there is none
    pub fn into_score(self) -> Result<f32> {
        self.score
            .ok_or_else(|| Error::GradingDegraded(format!("unparseable grade: {:?}", self.raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(GradeResponse::parse(" 0.85\n").score, Some(0.85));
        assert_eq!(GradeResponse::parse("1").score, Some(1.0));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(GradeResponse::parse("1.7").score, Some(1.0));
        assert_eq!(GradeResponse::parse("-0.2").score, Some(0.0));
    }

    #[test]
    fn test_prose_and_non_finite_are_ungradable() {
        for raw in ["The answer is well supported.", "", "NaN", "inf", "0.8 because"] {
            let grade = GradeResponse::parse(raw);
            assert_eq!(grade.score, None, "{:?}", raw);
            assert!(matches!(grade.into_score(), Err(Error::GradingDegraded(_))));
        }
    }
}
