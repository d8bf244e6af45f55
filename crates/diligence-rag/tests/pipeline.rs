//! End-to-end scenarios over the in-process stack with scripted models

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use diligence_rag::config::RagConfig;
use diligence_rag::generation::prompt::{
    ANALYST_SYSTEM_PROMPT, FAITHFULNESS_SYSTEM_PROMPT, NOT_FOUND_PHRASE, RELEVANCY_SYSTEM_PROMPT,
};
use diligence_rag::processing::{JobProgress, JobStatus, JobSummary, Pipeline};
use diligence_rag::providers::{
    ChatRequest, CredentialResolver, EmbeddingProvider, HashingEmbedder, LlmProvider,
    ProviderFactory, StaticCredentials, VectorIndex, VectorMatch, VectorRecord,
};
use diligence_rag::retrieval::{InMemoryVectorIndex, Namespace};
use diligence_rag::storage::{RecordStore, SqliteRecordStore};
use diligence_rag::types::{ProcessingState, Question, QuestionStatus};
use diligence_rag::{Error, EvaluationOutcome, RagService, Result};
use uuid::Uuid;

const TENANT: &str = "acme";
const PROJECT: &str = "deal-1";

/// Answers with a citation when given context, grades with fixed scores
struct ScriptedLlm;

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let reply = match request.system.as_deref() {
            Some(ANALYST_SYSTEM_PROMPT) if request.user.contains("\n[1] (") => {
                "Revenue grew 10% in 2023 [1].".to_string()
            }
            Some(ANALYST_SYSTEM_PROMPT) => NOT_FOUND_PHRASE.to_string(),
            Some(FAITHFULNESS_SYSTEM_PROMPT) => "0.9".to_string(),
            Some(RELEVANCY_SYSTEM_PROMPT) => "0.8".to_string(),
            _ => "unexpected".to_string(),
        };
        Ok(reply)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Hashing embedder and scripted LLM; can claim the embedder needs a key
struct TestProviders {
    embedder_needs_key: bool,
}

impl ProviderFactory for TestProviders {
    fn embedder_needs_credential(&self) -> bool {
        self.embedder_needs_key
    }

    fn embedder(&self, _credential: Option<&str>) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(HashingEmbedder::new(64)))
    }

    fn llm(&self, _credential: &str) -> Result<Arc<dyn LlmProvider>> {
        Ok(Arc::new(ScriptedLlm))
    }
}

/// Delegates to an in-memory index but refuses every write
struct UnreachableIndex {
    inner: Arc<InMemoryVectorIndex>,
}

#[async_trait]
impl VectorIndex for UnreachableIndex {
    async fn add(&self, _namespace: &Namespace, _records: Vec<VectorRecord>) -> Result<()> {
        Err(Error::provider("vectors", "connection refused"))
    }

    async fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        self.inner.query(namespace, vector, k).await
    }

    async fn delete(&self, namespace: &Namespace, vector_ids: &[String]) -> Result<usize> {
        self.inner.delete(namespace, vector_ids).await
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize> {
        self.inner.delete_namespace(namespace).await
    }

    async fn count(&self, namespace: &Namespace) -> Result<usize> {
        self.inner.count(namespace).await
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

struct Harness {
    service: RagService,
    store: Arc<SqliteRecordStore>,
    index: Arc<InMemoryVectorIndex>,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new(credentials: StaticCredentials) -> Self {
        let index = Arc::new(InMemoryVectorIndex::new());
        Self::build(credentials, TestProviders { embedder_needs_key: false }, index.clone(), index)
    }

    fn build(
        credentials: StaticCredentials,
        providers: TestProviders,
        pipeline_index: Arc<dyn VectorIndex>,
        index: Arc<InMemoryVectorIndex>,
    ) -> Self {
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let credentials: Arc<dyn CredentialResolver> = Arc::new(credentials);

        let mut config = RagConfig::default();
        config.embeddings.dimensions = 64;
        config.processing.max_concurrent_jobs = Some(2);

        let pipeline = Pipeline::new(config, store.clone(), pipeline_index, credentials, Arc::new(providers));

        Self {
            service: RagService::start(pipeline),
            store,
            index,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn with_key() -> Self {
        Self::new(StaticCredentials::new().with_shared("openai", "sk-test"))
    }

    async fn register(&self, name: &str, contents: &[u8]) -> String {
        let path: PathBuf = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let document = self
            .service
            .register_document(TENANT, PROJECT, &path)
            .await
            .unwrap();
        document.storage_path
    }

    async fn wait(&self, job_id: Uuid) -> JobProgress {
        for _ in 0..500 {
            let status = self.service.get_job_status(job_id).unwrap();
            if status.status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    fn state_of(&self, path: &str) -> ProcessingState {
        self.store
            .find_document_by_path(TENANT, PROJECT, path)
            .unwrap()
            .unwrap()
            .state
    }

    async fn ingest(&self, paths: Vec<String>) -> JobProgress {
        let job_id = self
            .service
            .submit_ingestion_job(TENANT, PROJECT, paths)
            .await
            .unwrap();
        self.wait(job_id).await
    }

    async fn ask(&self, question: &str) -> JobProgress {
        let job_id = self
            .service
            .submit_answering_job(TENANT, PROJECT, question)
            .await
            .unwrap();
        self.wait(job_id).await
    }
}

fn answer_id(progress: &JobProgress) -> Uuid {
    match progress.summary {
        Some(JobSummary::Answering { answer_id, .. }) => answer_id,
        ref other => panic!("expected answering summary, got {:?}", other),
    }
}

#[tokio::test]
async fn test_corrupt_document_fails_alone() {
    let h = Harness::with_key();
    let first = h
        .register("financials.txt", b"Revenue grew 10% in 2023.\n\nGross margin was 42%.")
        .await;
    let corrupt = h.register("broken.pdf", b"%PDF-1.4 this is not really a pdf").await;
    let third = h.register("notes.md", b"# Summary\n\nNet income was $5M.").await;

    let progress = h.ingest(vec![first.clone(), corrupt.clone(), third.clone()]).await;

    assert_eq!(progress.status, JobStatus::Completed);
    assert_eq!(progress.fraction, 1.0);
    match progress.summary {
        Some(JobSummary::Ingestion {
            documents_completed,
            documents_failed,
            documents_skipped,
            ..
        }) => {
            assert_eq!(documents_completed, 2);
            assert_eq!(documents_failed, 1);
            assert_eq!(documents_skipped, 0);
        }
        other => panic!("unexpected summary {:?}", other),
    }

    assert_eq!(h.state_of(&first), ProcessingState::Completed);
    assert_eq!(h.state_of(&corrupt), ProcessingState::Failed);
    assert_eq!(h.state_of(&third), ProcessingState::Completed);

    let failed = h
        .store
        .find_document_by_path(TENANT, PROJECT, &corrupt)
        .unwrap()
        .unwrap();
    assert!(failed.error_message.is_some());
    assert!(h.store.list_chunks(failed.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_chunk_ordinals_are_dense_and_indexed() {
    let h = Harness::with_key();
    let text = "The company expanded into three new markets during the year. ".repeat(40);
    let path = h.register("expansion.txt", text.as_bytes()).await;

    let progress = h.ingest(vec![path.clone()]).await;
    assert_eq!(progress.status, JobStatus::Completed);

    let document = h.store.find_document_by_path(TENANT, PROJECT, &path).unwrap().unwrap();
    let chunks = h.store.list_chunks(document.id).unwrap();
    assert!(chunks.len() > 1);
    let ordinals: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
    let expected: Vec<u32> = (0..chunks.len() as u32).collect();
    assert_eq!(ordinals, expected);
    assert_eq!(document.chunk_count as usize, chunks.len());

    let namespace = Namespace::for_project(TENANT, PROJECT);
    assert_eq!(h.index.count(&namespace).await.unwrap(), chunks.len());
}

#[tokio::test]
async fn test_reingestion_replaces_previous_chunks() {
    let h = Harness::with_key();
    let path = h.register("memo.txt", b"Revenue grew 10% in 2023.").await;
    let namespace = Namespace::for_project(TENANT, PROJECT);

    h.ingest(vec![path.clone()]).await;
    let first = h.index.count(&namespace).await.unwrap();
    h.ingest(vec![path.clone()]).await;

    assert_eq!(h.index.count(&namespace).await.unwrap(), first);
    let document = h.store.find_document_by_path(TENANT, PROJECT, &path).unwrap().unwrap();
    assert_eq!(h.store.list_chunks(document.id).unwrap().len(), first);
}

#[tokio::test]
async fn test_unregistered_path_is_skipped() {
    let h = Harness::with_key();
    let progress = h.ingest(vec!["/nowhere/ghost.pdf".to_string()]).await;

    assert_eq!(progress.status, JobStatus::Completed);
    assert!(matches!(
        progress.summary,
        Some(JobSummary::Ingestion {
            documents_skipped: 1,
            documents_completed: 0,
            ..
        })
    ));
}

#[tokio::test]
async fn test_unreachable_index_fails_job() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let unreachable = Arc::new(UnreachableIndex { inner: index.clone() });
    let h = Harness::build(
        StaticCredentials::new().with_shared("openai", "sk-test"),
        TestProviders { embedder_needs_key: false },
        unreachable,
        index,
    );
    let first = h.register("financials.txt", b"Revenue grew 10% in 2023.").await;
    let second = h.register("notes.txt", b"Net income was $5M.").await;

    let progress = h.ingest(vec![first.clone(), second.clone()]).await;

    assert_eq!(progress.status, JobStatus::Failed);
    let message = progress.message.unwrap();
    assert!(message.contains("connection refused"), "{}", message);
    assert!(progress.summary.is_none());

    assert_eq!(h.state_of(&first), ProcessingState::Failed);
    assert_eq!(h.state_of(&second), ProcessingState::Pending);
    let document = h.store.find_document_by_path(TENANT, PROJECT, &first).unwrap().unwrap();
    assert!(h.store.list_chunks(document.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_embedding_key_fails_ingestion_job() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let h = Harness::build(
        StaticCredentials::new(),
        TestProviders { embedder_needs_key: true },
        index.clone(),
        index,
    );
    let path = h.register("financials.txt", b"Revenue grew 10% in 2023.").await;

    let progress = h.ingest(vec![path.clone()]).await;

    assert_eq!(progress.status, JobStatus::Failed);
    let message = progress.message.unwrap();
    assert!(message.starts_with("Configuration error: No API key configured"), "{}", message);
    assert_eq!(h.state_of(&path), ProcessingState::Pending);
    assert_eq!(h.index.count(&Namespace::for_project(TENANT, PROJECT)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_answer_with_citation_and_scores() {
    let h = Harness::with_key();
    let path = h.register("financials.txt", b"Revenue grew 10% in 2023.").await;
    h.ingest(vec![path]).await;

    let progress = h.ask("What was revenue growth in 2023?").await;
    assert_eq!(progress.status, JobStatus::Completed);

    let answer = h.store.get_answer(answer_id(&progress)).unwrap().unwrap();
    assert_eq!(answer.text, "Revenue grew 10% in 2023 [1].");
    assert_eq!(answer.citations.len(), 1);
    assert_eq!(answer.citations[0].citation_order, 1);
    assert_eq!(answer.citations[0].excerpt, "Revenue grew 10% in 2023.");

    let scores = answer.scores;
    assert_eq!(scores.faithfulness, 0.9);
    assert_eq!(scores.relevancy, 0.8);
    let weighted = 0.25 * scores.retrieval + 0.15 * scores.coverage + 0.35 * scores.faithfulness + 0.25 * scores.relevancy;
    assert!((scores.overall - weighted).abs() <= 0.0015);

    let question = h.store.get_question(answer.question_id).unwrap().unwrap();
    assert_eq!(question.status, QuestionStatus::Review);
}

#[tokio::test]
async fn test_zero_contexts_still_answers() {
    let h = Harness::with_key();

    let progress = h.ask("What is the litigation exposure?").await;
    assert_eq!(progress.status, JobStatus::Completed);

    let answer = h.store.get_answer(answer_id(&progress)).unwrap().unwrap();
    assert_eq!(answer.text, NOT_FOUND_PHRASE);
    assert!(answer.citations.is_empty());
    assert_eq!(answer.scores.retrieval, 0.0);
    assert_eq!(answer.scores.coverage, 0.0);
    assert_eq!(answer.scores.overall, 0.515);
}

#[tokio::test]
async fn test_missing_credential_fails_answering_job() {
    let h = Harness::new(StaticCredentials::new());

    let progress = h.ask("What was revenue?").await;

    assert_eq!(progress.status, JobStatus::Failed);
    let message = progress.message.unwrap();
    assert!(message.starts_with("Configuration error: No API key configured"), "{}", message);
    assert!(h.store.find_question(TENANT, PROJECT, "What was revenue?").unwrap().is_none());
}

#[tokio::test]
async fn test_evaluate_without_reference_is_no_ground_truth() {
    let h = Harness::with_key();
    let progress = h.ask("Who audits the accounts?").await;

    let outcome = h.service.evaluate(answer_id(&progress)).await.unwrap();
    assert_eq!(outcome, EvaluationOutcome::NoGroundTruth);
}

#[tokio::test]
async fn test_evaluate_against_reference() {
    let h = Harness::with_key();
    let path = h.register("financials.txt", b"Revenue grew 10% in 2023.").await;
    h.ingest(vec![path]).await;

    let question = Question::new(TENANT, PROJECT, "What was revenue growth in 2023?")
        .with_ground_truth("Revenue grew 10% in 2023 [1].");
    h.store.create_question(&question).unwrap();

    let progress = h.ask("What was revenue growth in 2023?").await;
    let answer_id = answer_id(&progress);

    let first = h.service.evaluate(answer_id).await.unwrap();
    let second = h.service.evaluate(answer_id).await.unwrap();
    assert_eq!(first, second);

    match first {
        EvaluationOutcome::Metrics(metrics) => {
            assert_eq!(metrics.lcs_f1, Some(1.0));
            assert_eq!(metrics.semantic_similarity, Some(1.0));
            assert_eq!(metrics.overall, Some(1.0));
        }
        EvaluationOutcome::NoGroundTruth => panic!("reference answer was set"),
    }
}

#[tokio::test]
async fn test_delete_document_and_project_index() {
    let h = Harness::with_key();
    let a = h.register("a.txt", b"Alpha division revenue.").await;
    let b = h.register("b.txt", b"Beta division revenue.").await;
    h.ingest(vec![a.clone(), b]).await;

    let namespace = Namespace::for_project(TENANT, PROJECT);
    assert_eq!(h.index.count(&namespace).await.unwrap(), 2);

    let doc_a = h.store.find_document_by_path(TENANT, PROJECT, &a).unwrap().unwrap();
    assert!(h.service.delete_document("other-tenant", PROJECT, doc_a.id).await.is_err());
    h.service.delete_document(TENANT, PROJECT, doc_a.id).await.unwrap();

    assert!(h.store.get_document(doc_a.id).unwrap().is_none());
    assert_eq!(h.index.count(&namespace).await.unwrap(), 1);

    assert_eq!(h.service.delete_project_index(TENANT, PROJECT).await.unwrap(), 1);
    assert_eq!(h.index.count(&namespace).await.unwrap(), 0);
}
