//! Generated answers, citations and confidence scores

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplied context that the generated answer actually referenced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: Uuid,
    /// Set once the citation is attached to an answer
    #[serde(default)]
    pub answer_id: Option<Uuid>,
    /// Weak reference; the chunk may since have been deleted or re-indexed
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub page_number: Option<u32>,
    /// First 200 characters of the chunk text, `...` appended when truncated
    pub excerpt: String,
    /// Retrieval similarity of the cited context
    pub relevance_score: f32,
    /// The `[i]` label, i.e. the context's 1-based rank
    pub citation_order: u32,
}

/// Composite quality score of one generated answer. Every field lies in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub overall: f32,
    pub retrieval: f32,
    pub coverage: f32,
    pub faithfulness: f32,
    pub relevancy: f32,
}

impl ConfidenceScores {
    /// Fixed result when the scoring pipeline itself fails
    pub fn neutral() -> Self {
        Self {
            overall: 0.5,
            retrieval: 0.5,
            coverage: 0.5,
            faithfulness: 0.5,
            relevancy: 0.5,
        }
    }
}

/// A generated answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    /// Question text at generation time
    pub question_text: String,
    pub text: String,
    pub ai_generated: bool,
    /// Rank-ordered, strictly increasing `citation_order`
    pub citations: Vec<Citation>,
    pub scores: ConfidenceScores,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Answer {
    /// Build an AI-generated answer and bind its citations to it
    pub fn generated(
        question_id: Uuid,
        question_text: impl Into<String>,
        text: impl Into<String>,
        mut citations: Vec<Citation>,
        scores: ConfidenceScores,
    ) -> Self {
        let id = Uuid::new_v4();
        for citation in &mut citations {
            citation.answer_id = Some(id);
        }
        Self {
            id,
            question_id,
            question_text: question_text.into(),
            text: text.into(),
            ai_generated: true,
            citations,
            scores,
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_answer_binds_citations() {
        let citation = Citation {
            id: Uuid::new_v4(),
            answer_id: None,
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            page_number: Some(1),
            excerpt: "Revenue grew 10%.".into(),
            relevance_score: 0.9,
            citation_order: 1,
        };
        let answer = Answer::generated(
            Uuid::new_v4(),
            "What was growth?",
            "Revenue grew 10% [1].",
            vec![citation],
            ConfidenceScores::neutral(),
        );
        assert!(answer.ai_generated);
        assert_eq!(answer.citations[0].answer_id, Some(answer.id));
    }
}
