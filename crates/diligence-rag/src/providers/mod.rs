//! Provider abstractions for embeddings, LLMs, vector indexes and credentials
//!
//! The pipeline only sees the traits; concrete clients are built per job
//! by a `ProviderFactory` once the tenant's credential has been resolved.

pub mod credentials;
pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod openai;
pub mod retry;
pub mod vector_index;

use std::sync::Arc;

pub use credentials::{require_credential, CredentialResolver, EnvCredentialResolver, StaticCredentials};
pub use embedding::{Embedder, EmbeddingProvider};
pub use hashing::HashingEmbedder;
pub use llm::{ChatRequest, LlmProvider};
pub use openai::OpenAiClient;
pub use retry::RetryPolicy;
pub use vector_index::{VectorIndex, VectorMatch, VectorMetadata, VectorRecord};

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::{Error, Result};

/// Builds model clients for a resolved credential
pub trait ProviderFactory: Send + Sync {
    /// Whether `embedder` needs a credential
    fn embedder_needs_credential(&self) -> bool;

    fn embedder(&self, credential: Option<&str>) -> Result<Arc<dyn EmbeddingProvider>>;

    fn llm(&self, credential: &str) -> Result<Arc<dyn LlmProvider>>;
}

/// Factory driven by `RagConfig`
pub struct ConfiguredProviders {
    config: RagConfig,
}

impl ConfiguredProviders {
    pub fn new(config: RagConfig) -> Self {
        Self { config }
    }

    fn client(&self, credential: &str) -> Result<OpenAiClient> {
        let llm = &self.config.llm;
        Ok(OpenAiClient::new(&llm.base_url, credential, llm.timeout_secs)?
            .with_embedding_model(&self.config.embeddings.model, self.config.embeddings.dimensions)
            .with_retry(RetryPolicy::from_config(&self.config.retry)))
    }
}

impl ProviderFactory for ConfiguredProviders {
    fn embedder_needs_credential(&self) -> bool {
        self.config.embeddings.provider == EmbeddingBackend::OpenAi
    }

    fn embedder(&self, credential: Option<&str>) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.config.embeddings.provider {
            EmbeddingBackend::Hashing => {
                Ok(Arc::new(HashingEmbedder::new(self.config.embeddings.dimensions)))
            }
            EmbeddingBackend::OpenAi => {
                let credential = credential.ok_or_else(|| {
                    Error::config("The openai embedding backend requires an API key")
                })?;
                Ok(Arc::new(self.client(credential)?))
            }
        }
    }

    fn llm(&self, credential: &str) -> Result<Arc<dyn LlmProvider>> {
        Ok(Arc::new(self.client(credential)?))
    }
}
