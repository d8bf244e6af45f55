//! Answering jobs: embed the question, retrieve, generate, score, persist

use std::sync::Arc;

use uuid::Uuid;

use super::job_queue::{JobStatusSink, JobSummary};
use super::pipeline::Pipeline;
use crate::error::Result;
use crate::generation::AnswerGenerator;
use crate::providers::{Embedder, LlmProvider};
use crate::retrieval::{Namespace, Retriever};
use crate::scoring::ConfidenceScorer;
use crate::types::{Answer, Question, QuestionStatus};

pub const STAGE_EMBEDDING: &str = "embedding";
pub const STAGE_RETRIEVING: &str = "retrieving";
pub const STAGE_GENERATING: &str = "generating";
pub const STAGE_SCORING: &str = "scoring";
pub const STAGE_PERSISTING: &str = "persisting";

/// Runs single-question answering jobs
#[derive(Clone)]
pub struct AnsweringOrchestrator {
    pipeline: Pipeline,
    sink: Arc<dyn JobStatusSink>,
}

impl AnsweringOrchestrator {
    pub fn new(pipeline: Pipeline, sink: Arc<dyn JobStatusSink>) -> Self {
        Self { pipeline, sink }
    }

    /// Answer one question. The question record is created if the project
    /// has none with this text; its status ends at `review` on success and
    /// is reset to `pending` on failure.
    pub async fn run(
        &self,
        job_id: Uuid,
        tenant_id: &str,
        project_id: &str,
        question_text: &str,
    ) -> Result<JobSummary> {
        let credential = self.pipeline.credential(tenant_id).await?;
        let embedder = self.pipeline.embedder_with(Some(&credential))?;
        let llm = self.pipeline.llm(&credential)?;

        let store = &self.pipeline.store;
        let question = match store.find_question(tenant_id, project_id, question_text)? {
            Some(question) => question,
            None => {
                let question = Question::new(tenant_id, project_id, question_text);
                store.create_question(&question)?;
                question
            }
        };

        store.update_question_status(question.id, QuestionStatus::Processing)?;

        match self.answer(job_id, &question, embedder, llm).await {
            Ok(answer) => {
                store.update_question_status(question.id, QuestionStatus::Review)?;
                tracing::info!(
                    "Answered question {} with confidence {}",
                    question.id,
                    answer.scores.overall
                );
                Ok(JobSummary::Answering {
                    answer_id: answer.id,
                    question_id: question.id,
                    overall_confidence: answer.scores.overall,
                })
            }
            Err(e) => {
                if let Err(reset) = store.update_question_status(question.id, QuestionStatus::Pending) {
                    tracing::error!("Could not reset question {}: {}", question.id, reset);
                }
                Err(e)
            }
        }
    }

    async fn answer(
        &self,
        job_id: Uuid,
        question: &Question,
        embedder: Embedder,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Answer> {
        let config = &self.pipeline.config;
        let namespace = Namespace::for_project(&question.tenant_id, &question.project_id);
        let item = Some(question.text.as_str());

        self.sink.update_progress(job_id, 0.0, STAGE_EMBEDDING, item);
        let query = embedder.embed_one(&question.text).await?;

        self.sink.update_progress(job_id, 0.2, STAGE_RETRIEVING, item);
        let retriever = Retriever::new(embedder, Arc::clone(&self.pipeline.index), config.retrieval.top_k);
        let contexts = retriever.retrieve_by_vector(&namespace, &query).await?;

        self.sink.update_progress(job_id, 0.4, STAGE_GENERATING, item);
        let generator = AnswerGenerator::new(Arc::clone(&llm), config.llm.temperature);
        let generated = generator
            .generate(&question.text, &contexts, &config.llm.generate_model)
            .await?;

        self.sink.update_progress(job_id, 0.7, STAGE_SCORING, item);
        let scorer = ConfidenceScorer::new(llm, &config.llm.grader_model, config.scoring.coverage_threshold);
        let scores = scorer.score(&contexts, &generated.text, &question.text).await;

        self.sink.update_progress(job_id, 0.9, STAGE_PERSISTING, item);
        let answer = Answer::generated(
            question.id,
            &question.text,
            generated.text,
            generated.citations,
            scores,
        );
        self.pipeline.store.insert_answer(&answer)?;

        Ok(answer)
    }
}
