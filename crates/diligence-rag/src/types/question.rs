//! Questionnaire questions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review lifecycle of a question
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    /// No answer yet, or the last answering attempt failed
    Pending,
    /// An answering job is running
    Processing,
    /// An AI answer is waiting for human review
    Review,
    /// A reviewer accepted the answer
    Approved,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Review => "review",
            Self::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "review" => Self::Review,
            "approved" => Self::Approved,
            _ => Self::Pending,
        }
    }
}

/// A questionnaire question scoped to a tenant and project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub tenant_id: String,
    pub project_id: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    /// Reference answer used by offline evaluation
    #[serde(default)]
    pub ground_truth: Option<String>,
    pub status: QuestionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Question {
    pub fn new(
        tenant_id: impl Into<String>,
        project_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            project_id: project_id.into(),
            text: text.into(),
            category: None,
            number: None,
            ground_truth: None,
            status: QuestionStatus::Pending,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn with_ground_truth(mut self, reference: impl Into<String>) -> Self {
        self.ground_truth = Some(reference.into());
        self
    }

    /// Ground truth, ignoring blank strings
    pub fn reference_answer(&self) -> Option<&str> {
        self.ground_truth
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
